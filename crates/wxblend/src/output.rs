use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use wxblend_frame::WireFrame;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct FrameOutput<'a> {
    schema_id: &'a str,
    seq: u32,
    run: u16,
    block: u16,
    source: u8,
    datastream: u8,
    transfer_type: u8,
    frame_size: usize,
    data_size: u16,
}

pub fn print_frame(frame: &WireFrame, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = FrameOutput {
                schema_id: "https://schemas.meridianwx.dev/wxblend/cli/v1/frame.schema.json",
                seq: frame.header.seq,
                run: frame.header.run,
                block: frame.product.block,
                source: frame.header.source,
                datastream: frame.header.datastream,
                transfer_type: frame.product.transfer_type,
                frame_size: frame.len(),
                data_size: frame.product.data_size,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["SEQ", "RUN", "BLOCK", "SOURCE", "SIZE", "DATA"])
                .add_row(vec![
                    frame.header.seq.to_string(),
                    frame.header.run.to_string(),
                    frame.product.block.to_string(),
                    frame.header.source.to_string(),
                    frame.len().to_string(),
                    frame.product.data_size.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "seq={} run={} block={} source={} size={} data={}",
                frame.header.seq,
                frame.header.run,
                frame.product.block,
                frame.header.source,
                frame.len(),
                frame.product.data_size,
            );
        }
        OutputFormat::Raw => {
            print_raw(&frame.bytes);
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}
