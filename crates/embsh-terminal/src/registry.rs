//! Command trait, registry, and dispatch.
//!
//! A registry is built once when the shell is defined and shared read-only
//! between sessions. Lines are split on single spaces with no quoting: the
//! first token names the command, the rest are passed through as arguments.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};

use embsh_types::error::Result;

/// Trailer appended to the full help listing.
const HELP_TRAILER: &str = "\nhelp command for details about a command\n";

/// Doc text of the built-in `help` command.
const HELP_DOC: &str = "Show help\n\nhelp with no argument lists every command, help <command> shows its details";

/// A single executable command.
pub trait Command: Send + Sync {
    /// The command name (what the user types).
    fn name(&self) -> &str;

    /// Full documentation. The first line is the summary shown by `help`.
    /// An empty string marks the command as undocumented.
    fn description(&self) -> &str {
        ""
    }

    /// Run the command and return the text to send back to the client.
    fn execute(&self, args: &[&str]) -> Result<String>;
}

/// Adapter that lets plain functions and closures act as commands.
struct FnCommand<F> {
    name: String,
    doc: String,
    f: F,
}

impl<F> Command for FnCommand<F>
where
    F: Fn(&[&str]) -> Result<String> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }
    fn description(&self) -> &str {
        &self.doc
    }
    fn execute(&self, args: &[&str]) -> Result<String> {
        (self.f)(args)
    }
}

enum Handler {
    /// Built-in listing; needs the registry itself, so it is intercepted.
    Help,
    Command(Box<dyn Command>),
}

struct Entry {
    name: String,
    doc: Option<String>,
    handler: Handler,
}

impl Entry {
    fn summary(&self) -> Option<&str> {
        self.doc.as_deref().and_then(|d| d.lines().next())
    }
}

/// Ordered name -> handler table with dispatch.
///
/// `help` is always present and listed first. Registering a name that
/// already exists replaces the handler in place, keeping its position.
pub struct CommandRegistry {
    entries: Vec<Entry>,
    index: HashMap<String, usize>,
}

impl CommandRegistry {
    /// Create a registry holding only the built-in `help`.
    pub fn new() -> Self {
        let mut reg = Self {
            entries: Vec::new(),
            index: HashMap::new(),
        };
        reg.insert(Entry {
            name: "help".to_string(),
            doc: Some(HELP_DOC.to_string()),
            handler: Handler::Help,
        });
        reg
    }

    /// Register a command. Replaces any existing command with the same name.
    pub fn register(&mut self, cmd: Box<dyn Command>) {
        let doc = clean_doc(cmd.description());
        self.insert(Entry {
            name: cmd.name().to_string(),
            doc,
            handler: Handler::Command(cmd),
        });
    }

    /// Register a function or closure under `name`.
    pub fn register_fn<F>(&mut self, name: &str, doc: &str, f: F)
    where
        F: Fn(&[&str]) -> Result<String> + Send + Sync + 'static,
    {
        self.register(Box::new(FnCommand {
            name: name.to_string(),
            doc: doc.to_string(),
            f,
        }));
    }

    fn insert(&mut self, entry: Entry) {
        match self.index.get(&entry.name) {
            Some(&pos) => self.entries[pos] = entry,
            None => {
                self.index.insert(entry.name.clone(), self.entries.len());
                self.entries.push(entry);
            },
        }
    }

    fn lookup(&self, name: &str) -> Option<&Entry> {
        self.index.get(name).map(|&pos| &self.entries[pos])
    }

    /// Whether `name` resolves to a command.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Ordered `(name, summary)` pairs for completion and help.
    pub fn commands(&self) -> Vec<(&str, Option<&str>)> {
        self.entries
            .iter()
            .map(|e| (e.name.as_str(), e.summary()))
            .collect()
    }

    /// Resolve one input line and return the response text.
    ///
    /// A blank line produces an empty response. Unknown names produce
    /// `Command not found <name>` followed by the full help listing.
    pub fn resolve(&self, line: &str) -> String {
        if line.trim().is_empty() {
            return String::new();
        }
        let mut tokens = line.split(' ');
        let name = match tokens.next() {
            Some("?") => "help",
            Some(name) => name,
            None => return String::new(),
        };
        let args: Vec<&str> = tokens.collect();

        match self.lookup(name) {
            Some(entry) => self.invoke(entry, &args),
            None => self.not_found(name),
        }
    }

    fn invoke(&self, entry: &Entry, args: &[&str]) -> String {
        let cmd = match &entry.handler {
            Handler::Help => return self.help(args),
            Handler::Command(cmd) => cmd,
        };
        match catch_unwind(AssertUnwindSafe(|| cmd.execute(args))) {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                log::warn!("command {} failed: {e}", entry.name);
                format!("Error: {e}\n")
            },
            Err(_) => {
                log::warn!("command {} panicked", entry.name);
                format!("Error: command {} panicked\n", entry.name)
            },
        }
    }

    fn not_found(&self, name: &str) -> String {
        format!("Command not found {name}{}", self.help(&[]))
    }

    /// Built-in `help`.
    ///
    /// With no arguments, lists every command with its summary. With a
    /// known command name, shows that command's full documentation.
    pub fn help(&self, args: &[&str]) -> String {
        let Some(&topic) = args.first() else {
            let mut out = String::from("Help:\n");
            for entry in &self.entries {
                out.push_str(&entry.name);
                if let Some(summary) = entry.summary() {
                    out.push_str(": ");
                    out.push_str(summary);
                }
                out.push('\n');
            }
            out.push_str(HELP_TRAILER);
            return out;
        };
        match self.lookup(topic) {
            Some(entry) => match &entry.doc {
                Some(doc) => format!("{}: {doc}\n", entry.name),
                None => format!("{}\n", entry.name),
            },
            None => self.not_found(topic),
        }
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Trim surrounding blank space; treat an empty doc as missing.
fn clean_doc(doc: &str) -> Option<String> {
    let doc = doc.trim();
    (!doc.is_empty()).then(|| doc.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use embsh_types::error::ShellError;

    const HELLO_DOC: &str =
        "Hello world\n\nThis command accept arguments: hello tutu will display tutu";

    fn hello(args: &[&str]) -> Result<String> {
        if args.is_empty() {
            Ok("world\n".to_string())
        } else {
            Ok(format!("{}\n", args.join(" ")))
        }
    }

    struct EchoCmd;
    impl Command for EchoCmd {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Print arguments"
        }
        fn execute(&self, args: &[&str]) -> Result<String> {
            Ok(format!("{}\n", args.join(" ")))
        }
    }

    fn make_registry() -> CommandRegistry {
        let mut reg = CommandRegistry::new();
        reg.register_fn("hello", HELLO_DOC, hello);
        reg.register(Box::new(EchoCmd));
        reg.register_fn("quiet", "", |_args: &[&str]| Ok(String::new()));
        reg
    }

    #[test]
    fn test_hello_without_args() {
        assert_eq!(make_registry().resolve("hello"), "world\n");
    }

    #[test]
    fn test_hello_with_args() {
        assert_eq!(make_registry().resolve("hello tutu"), "tutu\n");
        assert_eq!(make_registry().resolve("hello a b"), "a b\n");
    }

    #[test]
    fn test_split_on_single_spaces() {
        // No whitespace collapsing: a double space yields an empty argument.
        assert_eq!(make_registry().resolve("echo  x"), " x\n");
    }

    #[test]
    fn test_no_quoting() {
        assert_eq!(make_registry().resolve("echo \"a b\""), "\"a b\"\n");
    }

    #[test]
    fn test_unknown_command() {
        let reg = make_registry();
        let out = reg.resolve("bogus");
        assert!(out.starts_with("Command not found bogus"));
        assert!(out.ends_with(&reg.help(&[])));
        assert_eq!(out, format!("Command not found bogus{}", reg.help(&[])));
    }

    #[test]
    fn test_unknown_command_with_args() {
        let out = make_registry().resolve("bogus 1 2");
        assert!(out.starts_with("Command not found bogus"));
    }

    #[test]
    fn test_help_listing_order_and_summaries() {
        let out = make_registry().help(&[]);
        assert_eq!(
            out,
            "Help:\nhelp: Show help\nhello: Hello world\necho: Print arguments\nquiet\n\nhelp command for details about a command\n"
        );
    }

    #[test]
    fn test_help_lists_each_command_once() {
        let reg = make_registry();
        let out = reg.help(&[]);
        for (name, _) in reg.commands() {
            let count = out.lines().filter(|l| l.split(':').next() == Some(name)).count();
            assert_eq!(count, 1, "{name} listed {count} times");
        }
    }

    #[test]
    fn test_help_single_command() {
        let reg = make_registry();
        assert_eq!(reg.help(&["hello"]), format!("hello: {HELLO_DOC}\n"));
        assert!(reg.resolve("help hello").contains(HELLO_DOC));
    }

    #[test]
    fn test_help_undocumented_command() {
        assert_eq!(make_registry().help(&["quiet"]), "quiet\n");
    }

    #[test]
    fn test_help_unknown_topic_falls_through() {
        let reg = make_registry();
        let out = reg.resolve("help nope");
        assert!(out.starts_with("Command not found nope"));
        assert!(out.contains("Help:\n"));
    }

    #[test]
    fn test_question_mark_alias() {
        let reg = make_registry();
        assert_eq!(reg.resolve("?"), reg.resolve("help"));
        assert_eq!(reg.resolve("? hello"), reg.resolve("help hello"));
    }

    #[test]
    fn test_empty_line_yields_nothing() {
        let reg = make_registry();
        assert_eq!(reg.resolve(""), "");
        assert_eq!(reg.resolve("   "), "");
    }

    #[test]
    fn test_duplicate_registration_last_wins() {
        let mut reg = make_registry();
        reg.register_fn("hello", "Replaced", |_args: &[&str]| {
            Ok("replaced\n".to_string())
        });
        assert_eq!(reg.resolve("hello"), "replaced\n");
        let names: Vec<&str> = reg.commands().iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec!["help", "hello", "echo", "quiet"]);
        assert_eq!(reg.commands()[1].1, Some("Replaced"));
    }

    #[test]
    fn test_commands_summaries() {
        let reg = make_registry();
        let cmds = reg.commands();
        assert_eq!(cmds[0], ("help", Some("Show help")));
        assert_eq!(cmds[1], ("hello", Some("Hello world")));
        assert_eq!(cmds[3], ("quiet", None));
        assert!(reg.contains("echo"));
        assert!(!reg.contains("run"));
    }

    #[test]
    fn test_handler_error_becomes_text() {
        let mut reg = CommandRegistry::new();
        reg.register_fn("fail", "Always fails", |_args: &[&str]| {
            Err(ShellError::Command("disk on fire".into()))
        });
        assert_eq!(reg.resolve("fail"), "Error: command error: disk on fire\n");
    }

    #[test]
    fn test_handler_panic_becomes_text() {
        let mut reg = CommandRegistry::new();
        reg.register_fn("boom", "Panics", |_args: &[&str]| panic!("kaboom"));
        assert_eq!(reg.resolve("boom"), "Error: command boom panicked\n");
        // Registry is still usable afterwards.
        assert!(reg.resolve("help").starts_with("Help:"));
    }

    #[test]
    fn test_override_help() {
        let mut reg = CommandRegistry::new();
        reg.register_fn("help", "Custom", |_args: &[&str]| Ok("custom\n".into()));
        assert_eq!(reg.resolve("?"), "custom\n");
    }
}
