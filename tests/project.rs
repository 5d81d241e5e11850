#[path = "project/config_schema.rs"]
mod config_schema;
