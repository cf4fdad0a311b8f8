use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "sbcss")]
#[command(about = "Component-scoped style sheet compiler")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compile style sheets and everything they import into one CSS file
    Build {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Write the CSS here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[command(flatten)]
        options: StyleOptions,
    },
    /// Print the module that exposes a style sheet's scoped class names
    Module {
        input: PathBuf,
        #[command(flatten)]
        options: StyleOptions,
    },
}

#[derive(Args, Debug)]
pub struct StyleOptions {
    /// JSON config file (`namespaceDivider`, `stateAttributePrefix`)
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Overrides the configured namespace divider
    #[arg(long)]
    pub divider: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_takes_many_inputs_and_an_output() {
        let cli = Cli::try_parse_from(["sbcss", "build", "a.st.css", "b.st.css", "-o", "out.css"])
            .expect("valid arguments");
        match cli.command {
            Commands::Build { inputs, output, options } => {
                assert_eq!(inputs, vec![PathBuf::from("a.st.css"), PathBuf::from("b.st.css")]);
                assert_eq!(output, Some(PathBuf::from("out.css")));
                assert!(options.config.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn build_requires_an_input() {
        assert!(Cli::try_parse_from(["sbcss", "build"]).is_err());
    }

    #[test]
    fn module_accepts_divider_override() {
        let cli = Cli::try_parse_from(["sbcss", "module", "x.st.css", "--divider", "_x_"])
            .expect("valid arguments");
        match cli.command {
            Commands::Module { options, .. } => assert_eq!(options.divider.as_deref(), Some("_x_")),
            other => panic!("unexpected command {:?}", other),
        }
    }
}
