mod format_output_path;
mod run_config;
