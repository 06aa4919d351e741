use std::fmt::{Display, Formatter};
use std::process::Command;

/// Program plus argument vector, independent of how it is executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandLine {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Builds from already split words; `None` when `words` is empty.
    pub fn from_words(mut words: Vec<String>) -> Option<Self> {
        if words.is_empty() {
            return None;
        }
        let program = words.remove(0);
        Some(Self {
            program,
            args: words,
        })
    }

    pub fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        command
    }
}

impl Display for CommandLine {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let words = std::iter::once(&self.program).chain(self.args.iter());
        write!(f, "{}", shell_words::join(words))
    }
}

#[cfg(test)]
mod tests {
    use super::CommandLine;

    #[test]
    fn display_quotes_words_with_spaces() {
        let cmd = CommandLine::new("rsync", ["-a", "a b"]);
        assert_eq!(cmd.to_string(), "rsync -a 'a b'");
    }

    #[test]
    fn from_words_splits_program() {
        assert_eq!(CommandLine::from_words(Vec::new()), None);
        let cmd = CommandLine::from_words(vec!["ls".into(), "-l".into()]).unwrap();
        assert_eq!(cmd, CommandLine::new("ls", ["-l"]));
    }
}
