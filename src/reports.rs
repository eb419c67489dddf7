use crate::database::{get_draw_by_round, get_draws_up_to_round};
use crate::statistics::{NumberFrequency, frequency_table, hot_cold_split};
use crate::tax::compute_tax;
use crate::utils::{format_number, format_won};
use anyhow::{Result, anyhow};
use chrono::Local;
use rusqlite::Connection;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Draws included in the report's hot/cold panel.
const REPORT_WINDOW: u32 = 30;

/// Ball colour used on the official draw sheet.
pub fn ball_color(number: u8) -> &'static str {
    match number {
        0..=10 => "#fbc400",
        11..=20 => "#69c8f2",
        21..=30 => "#ff7272",
        31..=40 => "#aaaaaa",
        _ => "#b0d840",
    }
}

fn ball(number: u8, extra_class: &str) -> String {
    format!(
        r#"<span class="ball {}" style="background:{}">{}</span>"#,
        extra_class,
        ball_color(number),
        number
    )
}

fn frequency_rows(numbers: &[NumberFrequency]) -> String {
    numbers
        .iter()
        .map(|n| {
            format!(
                r#"
                        <div class="freq-item">{}<span class="freq-count">{}회</span></div>"#,
                ball(n.number, "small"),
                n.frequency
            )
        })
        .collect()
}

pub fn generate_html_report(conn: &Connection, round: u32) -> Result<String> {
    let draw = get_draw_by_round(conn, round)?
        .ok_or_else(|| anyhow!("No draw found for round {}", round))?;

    let window = get_draws_up_to_round(conn, round, REPORT_WINDOW)?;
    let hot_cold = hot_cold_split(&frequency_table(&window));

    // Zero means the prize was never recorded for this round.
    let after_tax = match i64::try_from(draw.first_prize_amount)? {
        0 => 0,
        amount => compute_tax(amount)?.net_amount,
    };

    let balls: String = draw.numbers.iter().map(|n| ball(n, "")).collect();

    let mut html = String::new();

    html.push_str(&format!(
        r#"
<!DOCTYPE html>
<html lang="ko">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>로또 6/45 제{}회 당첨결과</title>
    <style>
        body {{
            font-family: 'Noto Sans KR', 'Malgun Gothic', sans-serif;
            margin: 0;
            padding: 20px;
            background: linear-gradient(135deg, #667eea 0%, #764ba2 100%);
            min-height: 100vh;
        }}
        .container {{
            max-width: 960px;
            margin: 0 auto;
            background: white;
            border-radius: 15px;
            box-shadow: 0 20px 40px rgba(0,0,0,0.1);
            overflow: hidden;
        }}
        .header {{
            background: linear-gradient(135deg, #ff6b6b, #feca57);
            color: white;
            padding: 30px;
            text-align: center;
        }}
        .header h1 {{
            margin: 0;
            font-size: 2.2em;
            text-shadow: 2px 2px 4px rgba(0,0,0,0.3);
        }}
        .header .date {{
            font-size: 1.2em;
            margin-top: 10px;
            opacity: 0.9;
        }}
        .content {{
            padding: 30px;
        }}
        .balls {{
            display: flex;
            justify-content: center;
            align-items: center;
            gap: 12px;
            margin-bottom: 30px;
        }}
        .ball {{
            display: inline-flex;
            justify-content: center;
            align-items: center;
            width: 56px;
            height: 56px;
            border-radius: 50%;
            color: white;
            font-size: 1.5em;
            font-weight: 700;
            text-shadow: 1px 1px 2px rgba(0,0,0,0.4);
        }}
        .ball.small {{
            width: 34px;
            height: 34px;
            font-size: 1em;
        }}
        .plus {{
            font-size: 2em;
            color: #718096;
        }}
        .stats {{
            background: #edf2f7;
            padding: 20px;
            margin-bottom: 30px;
            border-radius: 10px;
        }}
        .stats h3 {{
            margin-top: 0;
            color: #2d3748;
        }}
        .stats-grid {{
            display: grid;
            grid-template-columns: repeat(auto-fit, minmax(200px, 1fr));
            gap: 15px;
        }}
        .stat-item {{
            background: white;
            padding: 15px;
            border-radius: 8px;
            text-align: center;
            box-shadow: 0 2px 4px rgba(0,0,0,0.1);
        }}
        .stat-number {{
            font-size: 1.4em;
            font-weight: 700;
            color: #4834d4;
        }}
        .stat-label {{
            color: #718096;
            font-size: 0.9em;
        }}
        .freq-grid {{
            display: grid;
            grid-template-columns: repeat(5, 1fr);
            gap: 10px;
        }}
        .freq-item {{
            display: flex;
            align-items: center;
            gap: 6px;
        }}
        .freq-count {{
            color: #4a5568;
            font-size: 0.9em;
        }}
        .footer {{
            background: #2d3748;
            color: white;
            padding: 20px;
            text-align: center;
            font-size: 0.9em;
        }}
    </style>
</head>
<body>
    <div class="container">
        <div class="header">
            <h1>🎱 로또 6/45 제{}회 당첨결과</h1>
            <div class="date">추첨일 {}</div>
        </div>

        <div class="content">
            <div class="balls">
                {}
                <span class="plus">+</span>
                {}
            </div>

            <div class="stats">
                <h3>💰 1등 당첨 정보</h3>
                <div class="stats-grid">
                    <div class="stat-item">
                        <div class="stat-number">{}</div>
                        <div class="stat-label">1등 당첨금 (1인당)</div>
                    </div>
                    <div class="stat-item">
                        <div class="stat-number">{}</div>
                        <div class="stat-label">세후 실수령액</div>
                    </div>
                    <div class="stat-item">
                        <div class="stat-number">{}명</div>
                        <div class="stat-label">1등 당첨자 수</div>
                    </div>
                </div>
            </div>
"#,
        draw.round,
        draw.round,
        draw.date,
        balls,
        ball(draw.bonus, "bonus"),
        format_won(draw.first_prize_amount),
        format_won(after_tax),
        format_number(u64::from(draw.first_prize_winners)),
    ));

    html.push_str(&format!(
        r#"
            <div class="stats">
                <h3>🔥 최근 {}회차 많이 나온 번호</h3>
                <div class="freq-grid">{}
                </div>
            </div>

            <div class="stats">
                <h3>❄️ 최근 {}회차 적게 나온 번호</h3>
                <div class="freq-grid">{}
                </div>
            </div>
"#,
        window.len(),
        frequency_rows(&hot_cold.hot_numbers),
        window.len(),
        frequency_rows(&hot_cold.cold_numbers),
    ));

    html.push_str(&format!(
        r#"
        </div>

        <div class="footer">
            <p>📅 리포트 생성: {}</p>
            <p>🔗 데이터 출처: 동행복권</p>
        </div>
    </div>
</body>
</html>
"#,
        Local::now().format("%Y-%m-%d %H:%M:%S")
    ));

    Ok(html)
}

pub fn report_filename(round: u32) -> String {
    format!("lotto_report_{}.html", round)
}

pub fn save_html_report_to_path(
    html_content: &str,
    filename: &str,
    report_path: &str,
) -> Result<PathBuf> {
    let filepath = Path::new(report_path).join(filename);

    if let Some(parent) = filepath.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = File::create(&filepath)?;
    file.write_all(html_content.as_bytes())?;
    Ok(filepath)
}

pub fn generate_and_save_report_to_path(
    conn: &Connection,
    round: u32,
    report_path: &str,
) -> Result<PathBuf> {
    let html_content = generate_html_report(conn, round)?;
    save_html_report_to_path(&html_content, &report_filename(round), report_path)
}
