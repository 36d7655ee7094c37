// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//    http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
use std::error::Error;
use std::fs;

use clap::{arg, Arg, ArgMatches, Command};
use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;

use evm_cfg_builder::block::DISPATCHER_ID;
use evm_cfg_builder::cfg::Cfg;
use evm_cfg_builder::dot::function_to_dot;
use evm_cfg_builder::signature::{BuiltinSignatures, SignatureTable};

fn main() -> Result<(), Box<dyn Error>> {
    let matches = Command::new("evm-cfg-builder")
        .about("Recovers a control-flow graph from EVM bytecode")
        .version("0.1.0")
        .arg(Arg::new("code").short('c').long("code").help("Treat `target` as inline hex rather than a file path"))
        .arg(arg!(--verbose "Show verbose output"))
        .arg(
            Arg::new("export-dot")
                .long("export-dot")
                .help("Directory to write one .dot file per discovered function into")
                .takes_value(true),
        )
        .arg(Arg::new("target").required(true))
        .get_matches();

    if matches.is_present("verbose") {
        init_logging(LevelFilter::Info);
    }

    let ok = run(&matches)?;
    let exitcode = if ok { 0 } else { 1 };
    std::process::exit(exitcode);
}

fn run(args: &ArgMatches) -> Result<bool, Box<dyn Error>> {
    let target = args.get_one::<String>("target").unwrap();
    let mut hex = String::new();
    if args.contains_id("code") {
        hex.push_str(target);
    } else {
        let context = fs::read_to_string(target)?;
        for l in context.lines() {
            hex.push_str(l);
        }
    }

    let mut cfg = Cfg::new(hex, true, true, true, true);
    cfg.rename_known_selectors(&BuiltinSignatures::new());

    let mut selectors: Vec<_> = cfg.functions.keys().copied().collect();
    selectors.sort();
    for selector in &selectors {
        let function = &cfg.functions[selector];
        if *selector == DISPATCHER_ID {
            println!("{} @ {:#06x}", function.name, function.start_pc);
            continue;
        }
        let mut attrs = Vec::new();
        if function.is_payable() {
            attrs.push("payable");
        }
        if function.is_pure() {
            attrs.push("pure");
        } else if function.is_view() {
            attrs.push("view");
        }
        println!(
            "{} @ {:#06x} [{}] ({} blocks)",
            function.name,
            function.start_pc,
            attrs.join(", "),
            function.basic_blocks.len()
        );
    }

    if let Some(dir) = args.get_one::<String>("export-dot") {
        fs::create_dir_all(dir)?;
        for selector in &selectors {
            let function = &cfg.functions[selector];
            let path = format!("{}/{}.dot", dir, sanitize_filename(&function.name));
            fs::write(&path, function_to_dot(&cfg, function))?;
            log::info!("wrote {path}");
        }
    }

    Ok(true)
}

fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Initialise logging using a suitable pattern.
pub fn init_logging(level: LevelFilter) {
    let encoder = PatternEncoder::new("[{l}] {m}{n}");
    let stdout = ConsoleAppender::builder().encoder(Box::new(encoder)).build();
    let config = Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(level))
        .unwrap();
    let _handle = log4rs::init_config(config).unwrap();
}
