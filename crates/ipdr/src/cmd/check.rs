use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};

use crate::cmd::CheckArgs;
use crate::config::FileConfig;
use crate::exit::{CliError, CliResult, INTERNAL, SUCCESS};

pub fn run(args: CheckArgs) -> CliResult<i32> {
    let config = FileConfig::load(&args.config)?;

    if args.json {
        let rendered = serde_json::to_string_pretty(&config)
            .map_err(|e| CliError::new(INTERNAL, format!("rendering configuration: {e}")))?;
        println!("{rendered}");
        return Ok(SUCCESS);
    }

    let sessions = config
        .exporter
        .sessions
        .iter()
        .map(|s| {
            if s.name.is_empty() {
                s.id.to_string()
            } else {
                format!("{} ({})", s.id, s.name)
            }
        })
        .collect::<Vec<_>>()
        .join(", ");

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["SETTING", "VALUE"])
        .add_row(vec![
            "collector.address".to_string(),
            format!("{}:{}", config.collector.address, config.collector.port),
        ])
        .add_row(vec![
            "collector.vendor".to_string(),
            config.collector.vendor.clone(),
        ])
        .add_row(vec![
            "collector.output-dir".to_string(),
            config.collector.output_dir.display().to_string(),
        ])
        .add_row(vec![
            "collector.close-on-keepalive-timeout".to_string(),
            config.collector.close_on_keepalive_timeout.to_string(),
        ])
        .add_row(vec![
            "exporter.address".to_string(),
            format!("{}:{}", config.exporter.address, config.exporter.port),
        ])
        .add_row(vec![
            "exporter.keep-alive".to_string(),
            format!("{}s", config.exporter.keep_alive),
        ])
        .add_row(vec![
            "exporter.connect-timeout".to_string(),
            format!("{}s", config.exporter.connect_timeout),
        ])
        .add_row(vec!["exporter.sessions".to_string(), sessions]);
    println!("{table}");

    Ok(SUCCESS)
}
