use std::fs::File;
use std::io::Read;

use wxblend_frame::{FeedReader, FrameError};

use crate::cmd::InspectArgs;
use crate::exit::{frame_error, io_error, CliResult, SUCCESS};
use crate::output::{print_frame, OutputFormat};

pub fn run(args: InspectArgs, format: OutputFormat) -> CliResult<i32> {
    let input: Box<dyn Read> = if args.path.as_os_str() == "-" {
        Box::new(std::io::stdin())
    } else {
        Box::new(File::open(&args.path).map_err(|err| io_error("opening capture failed", err))?)
    };

    let mut reader = FeedReader::new(input);
    let mut shown = 0usize;

    loop {
        if let Some(count) = args.count {
            if shown >= count {
                break;
            }
        }

        match reader.read_frame() {
            Ok(frame) => {
                print_frame(&frame, format);
                shown += 1;
            }
            Err(FrameError::ConnectionClosed) => break,
            Err(err) => return Err(frame_error("decode failed", err)),
        }
    }

    Ok(SUCCESS)
}
