/// Command-mode commands and autocomplete

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    name: "products",
    aliases: &["p", "product", "list"],
    description: "Browse the product catalog",
  },
  Command {
    name: "add",
    aliases: &["a", "new", "create"],
    description: "Add a product",
  },
  Command {
    name: "reset",
    aliases: &["r", "clear"],
    description: "Clear the title filter",
  },
  Command {
    name: "refresh",
    aliases: &["reload"],
    description: "Refetch products from the API",
  },
  Command {
    name: "goto",
    aliases: &["go", "location"],
    description: "Open a location, e.g. goto ?page=3&size=20",
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit p9s",
  },
];

/// Look up a command by exact name or alias
pub fn find(input: &str) -> Option<&'static Command> {
  let input = input.trim().to_lowercase();
  COMMANDS
    .iter()
    .find(|cmd| cmd.name == input || cmd.aliases.contains(&input.as_str()))
}

/// Get autocomplete suggestions for a given input
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let input_lower = input.to_lowercase();

  if input_lower.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut matches: Vec<(&Command, u32)> = Vec::new();

  for cmd in COMMANDS {
    let priority = if cmd.name == input_lower {
      0
    } else if cmd.aliases.contains(&input_lower.as_str()) {
      1
    } else if cmd.name.starts_with(&input_lower) {
      2
    } else if cmd.aliases.iter().any(|a| a.starts_with(&input_lower)) {
      3
    } else if cmd.name.contains(&input_lower) {
      4
    } else if cmd.aliases.iter().any(|a| a.contains(&input_lower)) {
      5
    } else {
      continue;
    };
    matches.push((cmd, priority));
  }

  // Stable, so equal priorities keep declaration order
  matches.sort_by_key(|(_, priority)| *priority);

  matches.into_iter().map(|(cmd, _)| cmd).collect()
}
