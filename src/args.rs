//
// Microstacker - Focus stacking rig control panel
// Copyright (c) 2024 Microstacker contributors
//
// This project is licensed under the terms of the MIT license
// (see the LICENSE file for details).
//

//!
//! Command-line argument parsing.
//!

use std::path::PathBuf;

mod cmdline {
    pub const ENABLE_LOGGING: &str = "log";
    pub const CAPTURE_DIR: &str = "capture-dir";
}

#[derive(Debug, Default, PartialEq)]
pub struct Args {
    pub logging: bool,
    /// Overrides the capture directory from the configuration file.
    pub capture_dir: Option<PathBuf>
}

pub fn parse_command_line<I: Iterator<Item=String>>(stream: I) -> Args {
    let allowed_options = [cmdline::ENABLE_LOGGING, cmdline::CAPTURE_DIR];

    // key: option name
    let mut option_values = std::collections::HashMap::<String, Vec<String>>::new();

    let mut current: Option<&mut Vec<String>> = None;

    for arg in stream.skip(1) /*skip the binary name*/ {
        if let Some(option) = arg.strip_prefix("--") {
            if !allowed_options.contains(&option) {
                eprintln!("Unknown command-line option: {}.", option);
                return Args::default();
            }
            current = Some(option_values.entry(option.to_string()).or_default());
        } else {
            match current.as_mut() {
                Some(values) => values.push(arg),
                None => {
                    eprintln!("Unexpected value: {}.", arg);
                    return Args::default();
                }
            }
        }
    }

    let capture_dir = match option_values.get(cmdline::CAPTURE_DIR).map(|v| v.as_slice()) {
        None => None,
        Some([path]) => Some(PathBuf::from(path)),
        Some(_) => {
            eprintln!("Option --{} requires exactly one value.", cmdline::CAPTURE_DIR);
            None
        }
    };

    Args{
        logging: option_values.contains_key(cmdline::ENABLE_LOGGING),
        capture_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        parse_command_line(std::iter::once("microstacker").chain(args.iter().copied()).map(String::from))
    }

    #[test]
    fn given_no_arguments_defaults_are_returned() {
        assert_eq!(Args::default(), parse(&[]));
    }

    #[test]
    fn given_options_they_are_parsed() {
        assert_eq!(
            Args{ logging: true, capture_dir: Some(PathBuf::from("/tmp/captures")) },
            parse(&["--capture-dir", "/tmp/captures", "--log"])
        );
    }

    #[test]
    fn given_unknown_option_defaults_are_returned() {
        assert_eq!(Args::default(), parse(&["--log", "--fast"]));
    }

    #[test]
    fn given_value_without_option_defaults_are_returned() {
        assert_eq!(Args::default(), parse(&["stray", "--log"]));
    }

    #[test]
    fn given_capture_dir_without_value_it_is_ignored() {
        assert_eq!(Args{ logging: true, capture_dir: None }, parse(&["--capture-dir", "--log"]));
    }
}
