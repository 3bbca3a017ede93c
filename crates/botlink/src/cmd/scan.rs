use botlink_transport::{BridgeLink, Link};

use crate::cmd::ScanArgs;
use crate::exit::{transport_error, CliResult, SUCCESS};
use crate::output::{print_sockets, OutputFormat};

pub fn run(args: ScanArgs, format: OutputFormat) -> CliResult<i32> {
    let link = BridgeLink::new(&args.dir);
    let sockets = link
        .scan()
        .map_err(|err| transport_error("scan failed", err))?;

    print_sockets(link.search_dir(), &sockets, format);
    Ok(SUCCESS)
}
