pub mod mcp_handler;
pub mod use_cases;
