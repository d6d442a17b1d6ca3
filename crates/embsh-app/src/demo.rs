//! Commands registered by the demo shell.

use embsh_terminal::{Command, CommandRegistry};
use embsh_types::error::Result;

/// `hello [words...]`: greets, or echoes its arguments back.
struct Hello;

impl Command for Hello {
    fn name(&self) -> &str {
        "hello"
    }

    fn description(&self) -> &str {
        "Hello world\n\nThis command accept arguments: hello tutu will display tutu"
    }

    fn execute(&self, args: &[&str]) -> Result<String> {
        if args.is_empty() {
            Ok("world\n".to_string())
        } else {
            Ok(format!("{}\n", args.join(" ")))
        }
    }
}

pub fn demo_registry() -> CommandRegistry {
    let mut registry = CommandRegistry::new();
    registry.register(Box::new(Hello));
    log::debug!("demo registry: {} commands", registry.commands().len());
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hello_without_args() {
        assert_eq!(demo_registry().resolve("hello"), "world\n");
    }

    #[test]
    fn test_hello_with_args() {
        let reg = demo_registry();
        assert_eq!(reg.resolve("hello tutu"), "tutu\n");
        assert_eq!(reg.resolve("hello a b"), "a b\n");
    }

    #[test]
    fn test_help_lists_hello_summary() {
        let listing = demo_registry().resolve("help");
        assert!(listing.contains("hello: Hello world\n"));
        assert!(!listing.contains("tutu"));
    }

    #[test]
    fn test_help_hello_full_doc() {
        let doc = demo_registry().resolve("? hello");
        assert!(doc.starts_with("hello: Hello world"));
        assert!(doc.contains("hello tutu will display tutu"));
    }
}
