//! Line commands for the interactive driver
//!
//! Each stdin line parses into an [`Input`]; most map straight onto one
//! [`Action`].

use nimbus_core::{Action, DegreeUnit, LocationId, WindUnit};
use thiserror::Error;

pub const HELP: &str = "\
commands:
  add <name>        save a location
  rm <id>           delete a saved location
  select <id>       use a saved location for the active weather
  gps on|off        use device coordinates instead of the selection
  unit c|f          temperature unit
  wind mph|kph      wind speed unit
  interval <n>      refresh every n seconds (5-60)
  notify on|off     background notifications
  list              show saved locations and fetch their weather
  refresh           fetch the active weather now
  help              show this text
  quit              exit";

#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Dispatch(Action),
    /// Show the location list (also dispatches `LocationListShown`)
    List,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command `{0}` (try `help`)")]
    Unknown(String),
    #[error("`{command}` needs {expected}")]
    MissingArgument {
        command: &'static str,
        expected: &'static str,
    },
    #[error("`{command}`: {message}")]
    Invalid {
        command: &'static str,
        message: String,
    },
}

fn invalid(command: &'static str, message: impl ToString) -> CommandError {
    CommandError::Invalid {
        command,
        message: message.to_string(),
    }
}

fn required<'a>(
    arg: &'a str,
    command: &'static str,
    expected: &'static str,
) -> Result<&'a str, CommandError> {
    if arg.is_empty() {
        Err(CommandError::MissingArgument { command, expected })
    } else {
        Ok(arg)
    }
}

fn on_off(arg: &str, command: &'static str) -> Result<bool, CommandError> {
    match required(arg, command, "on or off")?.to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Ok(true),
        "off" | "false" | "no" | "0" => Ok(false),
        other => Err(invalid(command, format!("expected on or off, got `{other}`"))),
    }
}

fn location_id(arg: &str, command: &'static str) -> Result<LocationId, CommandError> {
    required(arg, command, "a location id")?
        .parse::<i64>()
        .map(LocationId)
        .map_err(|_| invalid(command, format!("`{arg}` is not a location id")))
}

/// Parse one line. Blank lines yield `Ok(None)`.
pub fn parse_input(line: &str) -> Result<Option<Input>, CommandError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let input = match word.to_ascii_lowercase().as_str() {
        "add" => Input::Dispatch(Action::LocationInsert(
            required(rest, "add", "a location name")?.to_string(),
        )),
        "rm" | "delete" => Input::Dispatch(Action::LocationDelete(location_id(rest, "rm")?)),
        "select" => Input::Dispatch(Action::LocationSelect(location_id(rest, "select")?)),
        "gps" => Input::Dispatch(Action::GpsSet(on_off(rest, "gps")?)),
        "notify" => Input::Dispatch(Action::NotificationsSet(on_off(rest, "notify")?)),
        "unit" => {
            let unit = required(rest, "unit", "c or f")?
                .parse::<DegreeUnit>()
                .map_err(|e| invalid("unit", e))?;
            Input::Dispatch(Action::DegreeUnitSet(unit))
        }
        "wind" => {
            let unit = required(rest, "wind", "mph or kph")?
                .parse::<WindUnit>()
                .map_err(|e| invalid("wind", e))?;
            Input::Dispatch(Action::WindUnitSet(unit))
        }
        "interval" => {
            let secs = required(rest, "interval", "a number of seconds")?
                .parse::<u32>()
                .map_err(|_| invalid("interval", format!("`{rest}` is not a number")))?;
            Input::Dispatch(Action::RefreshIntervalSet(secs))
        }
        "refresh" => Input::Dispatch(Action::WeatherFetch),
        "list" | "ls" => Input::List,
        "help" | "?" => Input::Help,
        "quit" | "exit" | "q" => Input::Quit,
        _ => return Err(CommandError::Unknown(word.to_string())),
    };
    Ok(Some(input))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(line: &str) -> Action {
        match parse_input(line) {
            Ok(Some(Input::Dispatch(action))) => action,
            other => panic!("expected an action for {line:?}, got {other:?}"),
        }
    }

    #[test]
    fn test_location_commands() {
        assert_eq!(action("add  New York "), Action::LocationInsert("New York".into()));
        assert_eq!(action("rm 7"), Action::LocationDelete(LocationId(7)));
        assert_eq!(action("SELECT 3"), Action::LocationSelect(LocationId(3)));
        assert_eq!(parse_input("list"), Ok(Some(Input::List)));
    }

    #[test]
    fn test_setting_commands() {
        assert_eq!(action("gps on"), Action::GpsSet(true));
        assert_eq!(action("notify off"), Action::NotificationsSet(false));
        assert_eq!(action("unit f"), Action::DegreeUnitSet(DegreeUnit::Fahrenheit));
        assert_eq!(action("wind mph"), Action::WindUnitSet(WindUnit::Mph));
        // range checking belongs to the reducer
        assert_eq!(action("interval 90"), Action::RefreshIntervalSet(90));
        assert_eq!(action("refresh"), Action::WeatherFetch);
    }

    #[test]
    fn test_blank_and_control_lines() {
        assert_eq!(parse_input("   "), Ok(None));
        assert_eq!(parse_input("q"), Ok(Some(Input::Quit)));
        assert_eq!(parse_input("help"), Ok(Some(Input::Help)));
    }

    #[test]
    fn test_errors() {
        assert_eq!(parse_input("fly"), Err(CommandError::Unknown("fly".into())));
        assert!(matches!(
            parse_input("add"),
            Err(CommandError::MissingArgument { command: "add", .. })
        ));
        assert!(matches!(
            parse_input("rm paris"),
            Err(CommandError::Invalid { command: "rm", .. })
        ));
        assert!(matches!(
            parse_input("gps maybe"),
            Err(CommandError::Invalid { command: "gps", .. })
        ));
        assert!(matches!(
            parse_input("unit kelvin"),
            Err(CommandError::Invalid { command: "unit", .. })
        ));
    }
}
