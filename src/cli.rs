use std::path::PathBuf;

use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};

use rewrite_stream::oembed::DEFAULT_OBJECT_URI_TEMPLATE;
use rewrite_stream::{Config, Output};

pub(super) fn root_cli() -> Command {
    Command::new("update-object-uri")
        .about("Rewrite the object_uri of oEmbed photo records read as JSON Lines")
        .arg(
            Arg::new("workers")
                .long("workers")
                .value_name("N")
                .value_parser(value_parser!(usize))
                .help("The number of concurrent workers [default: number of CPUs]"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .action(ArgAction::SetTrue)
                .help("Emit results as a JSON array."),
        )
        .arg(
            Arg::new("format")
                .long("format")
                .action(ArgAction::SetTrue)
                .help("Emit results as formatted JSON."),
        )
        .arg(
            Arg::new("timings")
                .long("timings")
                .action(ArgAction::SetTrue)
                .help("Log timings (time to wait to process, time to complete processing)"),
        )
        .arg(
            Arg::new("stdout")
                .long("stdout")
                .value_name("BOOL")
                .value_parser(value_parser!(bool))
                .num_args(0..=1)
                .default_value("true")
                .default_missing_value("true")
                .help("Emit to STDOUT"),
        )
        .arg(
            Arg::new("null")
                .long("null")
                .action(ArgAction::SetTrue)
                .help("Emit to /dev/null"),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .value_name("PATH")
                .value_parser(value_parser!(PathBuf))
                .action(ArgAction::Append)
                .help("Also emit to a file, compressed by extension (.gz, .zst, .bz2, .xz)"),
        )
        .arg(
            Arg::new("input")
                .long("input")
                .short('i')
                .value_name("PATH")
                .value_parser(value_parser!(PathBuf))
                .help("Read records from a file instead of STDIN (\"-\" for STDIN)"),
        )
        .arg(
            Arg::new("template")
                .long("template")
                .value_name("URI_TEMPLATE")
                .default_value(DEFAULT_OBJECT_URI_TEMPLATE)
                .help("URI template for the new object_uri; {id} is the object id"),
        )
}

/// Everything the binary needs from its arguments.
#[derive(Debug)]
pub(super) struct Invocation {
    pub(super) config: Config,
    pub(super) input: Option<PathBuf>,
    pub(super) template: String,
}

pub(super) fn parse(matches: &ArgMatches) -> Invocation {
    let mut config = Config::default()
        .with_emit_array(matches.get_flag("json"))
        .with_pretty_print(matches.get_flag("format"))
        .with_emit_timings(matches.get_flag("timings"));

    if let Some(workers) = matches.get_one::<usize>("workers") {
        config = config.with_workers(*workers);
    }

    let mut outputs = Vec::new();
    if matches.get_one::<bool>("stdout").copied().unwrap_or(true) {
        outputs.push(Output::Stdout);
    }
    if matches.get_flag("null") {
        outputs.push(Output::Discard);
    }
    if let Some(paths) = matches.get_many::<PathBuf>("output") {
        outputs.extend(paths.cloned().map(Output::File));
    }

    Invocation {
        config: config.with_outputs(outputs),
        input: matches.get_one::<PathBuf>("input").cloned(),
        template: matches
            .get_one::<String>("template")
            .cloned()
            .unwrap_or_else(|| DEFAULT_OBJECT_URI_TEMPLATE.to_string()),
    }
}
