use std::path::Path;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use glucotux_session::{ResultRecord, SessionReport};
use glucotux_transport::ScannedNode;
use serde::Serialize;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Log lines and progress, like the log file.
    Text,
    /// One JSON object per line.
    Json,
    /// A table printed after the transfer.
    Table,
}

pub fn print_readout(
    report: &SessionReport,
    records: &[ResultRecord],
    log_path: &Path,
    format: OutputFormat,
) {
    match format {
        OutputFormat::Text => {
            if !report.ready {
                println!("{} has no data to send", report.kind);
                return;
            }
            println!("{} records read from {}", report.results, report.kind);
            if !log_path.as_os_str().is_empty() {
                println!("written to {}", log_path.display());
            }
        }
        OutputFormat::Json => {
            for record in records {
                println!(
                    "{}",
                    serde_json::to_string(record).unwrap_or_else(|_| "{}".to_string())
                );
            }
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["NO", "TIME", "TEST", "VALUE", "UNIT", "FLAGS"]);
            for record in records {
                table.add_row(vec![
                    record.number.to_string(),
                    glucotux_session::format_meter_time(&record.timestamp)
                        .unwrap_or_else(|| record.timestamp.clone()),
                    record.test.clone(),
                    record.value.to_string(),
                    record.unit.clone(),
                    record.flags.clone(),
                ]);
            }
            println!("{table}");
        }
    }
}

#[derive(Serialize)]
struct ScanOutput<'a> {
    path: String,
    vendor: Option<String>,
    product: Option<String>,
    meter: Option<&'a str>,
    error: Option<&'a str>,
}

impl<'a> From<&'a ScannedNode> for ScanOutput<'a> {
    fn from(node: &'a ScannedNode) -> Self {
        Self {
            path: node.path.display().to_string(),
            vendor: node.info.map(|info| format!("{:04x}", info.vendor)),
            product: node.info.map(|info| format!("{:04x}", info.product)),
            meter: node.kind.map(|kind| kind.name()),
            error: node.error.as_deref(),
        }
    }
}

pub fn print_scan(nodes: &[ScannedNode], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            for node in nodes {
                println!(
                    "{}",
                    serde_json::to_string(&ScanOutput::from(node))
                        .unwrap_or_else(|_| "{}".to_string())
                );
            }
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["NODE", "VENDOR", "PRODUCT", "METER"]);
            for node in nodes {
                let out = ScanOutput::from(node);
                table.add_row(vec![
                    out.path,
                    out.vendor.unwrap_or_else(|| "-".to_string()),
                    out.product.unwrap_or_else(|| "-".to_string()),
                    out.meter
                        .or(out.error)
                        .unwrap_or("not supported")
                        .to_string(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Text => {
            if nodes.is_empty() {
                println!("no hid nodes found");
            }
            for node in nodes {
                let out = ScanOutput::from(node);
                match (&out.vendor, &out.product) {
                    (Some(vendor), Some(product)) => println!(
                        "{}  {vendor}:{product}  {}",
                        out.path,
                        out.meter.unwrap_or("not supported")
                    ),
                    _ => println!("{}  {}", out.path, out.error.unwrap_or("unknown")),
                }
            }
        }
    }
}
