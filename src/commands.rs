//! Shell commands, parsing and autocomplete logic

use color_eyre::{eyre::eyre, Result};

#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub usage: &'static str,
  pub description: &'static str,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    name: "all",
    aliases: &["a"],
    usage: "all",
    description: "Show transactions of all employees",
  },
  Command {
    name: "employee",
    aliases: &["e", "filter"],
    usage: "employee <id>",
    description: "Show transactions of one employee",
  },
  Command {
    name: "employees",
    aliases: &["ls", "people"],
    usage: "employees",
    description: "List employees available as filters",
  },
  Command {
    name: "more",
    aliases: &["m", "next"],
    usage: "more",
    description: "Load the next page of transactions",
  },
  Command {
    name: "approve",
    aliases: &["ok", "y"],
    usage: "approve <transaction-id>",
    description: "Approve a transaction",
  },
  Command {
    name: "reject",
    aliases: &["unapprove", "n"],
    usage: "reject <transaction-id>",
    description: "Remove approval from a transaction",
  },
  Command {
    name: "show",
    aliases: &["s", "list"],
    usage: "show",
    description: "Print the current transaction list",
  },
  Command {
    name: "refresh",
    aliases: &["r", "reload"],
    usage: "refresh",
    description: "Drop cached transactions and reload the current view",
  },
  Command {
    name: "help",
    aliases: &["h", "?"],
    usage: "help",
    description: "List commands",
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    usage: "quit",
    description: "Exit txreview",
  },
];

/// A parsed command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
  All,
  Employee(String),
  Employees,
  More,
  SetApproval { transaction_id: String, value: bool },
  Show,
  Refresh,
  Help,
  Quit,
}

/// Parse one line of input.
///
/// The first word is resolved through autocomplete, so any unambiguous
/// prefix or alias works. Empty input shows the current list.
pub fn parse(line: &str) -> Result<Action> {
  let mut words = line.split_whitespace();
  let Some(word) = words.next() else {
    return Ok(Action::Show);
  };
  let argument = words.next();

  let command = get_suggestions(word)
    .into_iter()
    .next()
    .ok_or_else(|| eyre!("Unknown command: {} (try help)", word))?;

  let require = |what: &str| {
    argument
      .map(String::from)
      .ok_or_else(|| eyre!("Missing {}. Usage: {}", what, command.usage))
  };

  let action = match command.name {
    "all" => Action::All,
    "employee" => Action::Employee(require("employee id")?),
    "employees" => Action::Employees,
    "more" => Action::More,
    "approve" => Action::SetApproval {
      transaction_id: require("transaction id")?,
      value: true,
    },
    "reject" => Action::SetApproval {
      transaction_id: require("transaction id")?,
      value: false,
    },
    "show" => Action::Show,
    "refresh" => Action::Refresh,
    "help" => Action::Help,
    "quit" => Action::Quit,
    other => return Err(eyre!("Unhandled command: {}", other)),
  };

  Ok(action)
}

/// Get autocomplete suggestions for a given input
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let input_lower = input.to_lowercase();

  if input_lower.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut matches: Vec<(&Command, u32)> = Vec::new();

  for cmd in COMMANDS {
    // Exact match on name
    if cmd.name == input_lower {
      matches.push((cmd, 0)); // Highest priority
      continue;
    }

    // Exact match on alias
    if cmd.aliases.contains(&input_lower.as_str()) {
      matches.push((cmd, 1));
      continue;
    }

    // Prefix match on name
    if cmd.name.starts_with(&input_lower) {
      matches.push((cmd, 2));
      continue;
    }

    // Prefix match on alias
    if cmd.aliases.iter().any(|a| a.starts_with(&input_lower)) {
      matches.push((cmd, 3));
    }
  }

  // Sort by priority
  matches.sort_by_key(|(_, priority)| *priority);

  matches.into_iter().map(|(cmd, _)| cmd).collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_input_returns_all() {
    let suggestions = get_suggestions("");
    assert_eq!(suggestions.len(), COMMANDS.len());
  }

  #[test]
  fn test_exact_match_beats_prefix() {
    let suggestions = get_suggestions("employee");
    assert_eq!(suggestions[0].name, "employee");
    assert_eq!(suggestions[1].name, "employees");
  }

  #[test]
  fn test_alias_match() {
    let suggestions = get_suggestions("q");
    assert!(!suggestions.is_empty());
    assert_eq!(suggestions[0].name, "quit");
  }

  #[test]
  fn test_prefix_match() {
    let suggestions = get_suggestions("app");
    assert!(!suggestions.is_empty());
    assert_eq!(suggestions[0].name, "approve");
  }

  #[test]
  fn test_parse_with_argument() {
    assert_eq!(
      parse("approve tx-0001").unwrap(),
      Action::SetApproval {
        transaction_id: "tx-0001".to_string(),
        value: true,
      }
    );
    assert_eq!(
      parse("e 4a7b6c01").unwrap(),
      Action::Employee("4a7b6c01".to_string())
    );
  }

  #[test]
  fn test_parse_missing_argument() {
    let err = parse("reject").unwrap_err();
    assert!(err.to_string().contains("reject <transaction-id>"));
  }

  #[test]
  fn test_parse_empty_line_shows_list() {
    assert_eq!(parse("   ").unwrap(), Action::Show);
  }

  #[test]
  fn test_parse_unknown_command() {
    assert!(parse("frobnicate").is_err());
  }
}
