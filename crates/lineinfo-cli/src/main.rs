use clap::Parser;
use ecma_lineinfo::dump::dump;
use ecma_lineinfo::{finalize, LineInfo, LineInfoRecorder, OffsetTable};
use std::fmt;
use std::fs;

#[derive(Debug, Parser)]
#[command(name = "lineinfo-cli")]
struct Args {
    /// Event file with one `offset line column` triple per line, or a
    /// packed table when --packed is given.
    #[arg()]
    input: String,

    /// Treat the input file as an already packed table.
    #[arg(long = "packed", default_value_t = false)]
    packed: bool,

    /// Write the packed table to this file.
    #[arg(short = 'o', long = "output")]
    output: Option<String>,

    /// Print the structure of the table.
    #[arg(short = 'd', long = "dump", default_value_t = false)]
    dump: bool,

    /// Resolve these bytecode offsets to source positions.
    #[arg(long = "locate")]
    locate: Vec<u32>,
}

#[derive(Debug, Eq, PartialEq)]
enum CliError {
    PackedInputCannotBeRepacked,
    NothingToDo,
    BadEventLine { line_number: usize },
    Io { path: String, message: String },
    BadTable { message: String },
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::PackedInputCannotBeRepacked => {
                f.write_str("--packed input cannot be written with -o")
            }
            CliError::NothingToDo => f.write_str("nothing to do: pass -o, --dump or --locate"),
            CliError::BadEventLine { line_number } => {
                write!(f, "bad event on line {line_number}: expected `offset line column`")
            }
            CliError::Io { path, message } => write!(f, "{path}: {message}"),
            CliError::BadTable { message } => write!(f, "invalid table: {message}"),
        }
    }
}

fn parse_events(text: &str) -> Result<Vec<(u32, u32, u32)>, CliError> {
    let mut events = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut fields = line.split_whitespace().map(str::parse::<u32>);
        let event = match (fields.next(), fields.next(), fields.next(), fields.next()) {
            (Some(Ok(offset)), Some(Ok(line)), Some(Ok(column)), None) => (offset, line, column),
            _ => {
                return Err(CliError::BadEventLine {
                    line_number: index + 1,
                })
            }
        };
        events.push(event);
    }
    Ok(events)
}

fn load(args: &Args) -> Result<LineInfo, CliError> {
    let bytes = fs::read(&args.input).map_err(|err| CliError::Io {
        path: args.input.clone(),
        message: err.to_string(),
    })?;

    if args.packed {
        return LineInfo::from_bytes(bytes).map_err(|err| CliError::BadTable {
            message: err.to_string(),
        });
    }

    let text = String::from_utf8_lossy(&bytes);
    let events = parse_events(&text)?;
    let mut recorder = LineInfoRecorder::new();
    for (offset, line, column) in events {
        recorder.append(offset, line, column);
    }
    Ok(finalize(recorder, &OffsetTable::identity()))
}

fn run(args: &Args) -> Result<(), CliError> {
    if args.packed && args.output.is_some() {
        return Err(CliError::PackedInputCannotBeRepacked);
    }
    if args.output.is_none() && !args.dump && args.locate.is_empty() {
        return Err(CliError::NothingToDo);
    }

    let info = load(args)?;

    if let Some(path) = &args.output {
        fs::write(path, info.as_bytes()).map_err(|err| CliError::Io {
            path: path.clone(),
            message: err.to_string(),
        })?;
    }
    if args.dump {
        let mut out = String::new();
        if dump(info.as_bytes(), &mut out).is_ok() {
            print!("{out}");
        }
    }
    for &offset in &args.locate {
        let (line, column) = info.locate(offset);
        println!("{offset}: line {line}, column {column}");
    }
    Ok(())
}

fn main() {
    let args = Args::parse();
    if let Err(err) = run(&args) {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_triples_and_comments() {
        let events = parse_events("# header\n0 1 1\n\n10 1 5\n").unwrap();
        assert_eq!(events, [(0, 1, 1), (10, 1, 5)]);
    }

    #[test]
    fn rejects_malformed_lines() {
        let err = parse_events("0 1\n").unwrap_err();
        assert_eq!(err, CliError::BadEventLine { line_number: 1 });
        let err = parse_events("0 1 1\n5 x 2\n").unwrap_err();
        assert_eq!(err, CliError::BadEventLine { line_number: 2 });
        let err = parse_events("0 1 1 9\n").unwrap_err();
        assert_eq!(err, CliError::BadEventLine { line_number: 1 });
    }
}
