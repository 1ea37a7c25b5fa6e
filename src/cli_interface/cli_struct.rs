use clap::Parser;

#[derive(Parser, Debug, PartialEq)]
#[command(author, version, about, long_about)]
pub enum SimFsCli {
    /// write a freshly initialized partition image
    Mkfs(MkfsArgs),
    /// print what a partition image holds
    Info(InfoArgs),
}
///make a new partition image subcommand
#[derive(clap::Args, Debug, PartialEq)]
#[command(author, version, about = "make a new partition image")]
pub struct MkfsArgs {
    /// the path of the partition image file
    #[clap(short = 'p', long)]
    pub image_file_path: String,
    /// overwrite the image file if it already exists
    #[clap(short, long)]
    pub force: bool,
}

/// inspect an image subcommand
#[derive(clap::Args, Debug, PartialEq)]
#[command(author, version, about = "describe a partition image")]
pub struct InfoArgs {
    /// the path of the partition image file
    #[clap(short = 'p', long)]
    pub image_file_path: String,
}


/// test the `SimFsCli` struct
/// test `info` subcommand
#[cfg(test)]
mod info_parse_args_tests {
    use super::*;
    #[test]
    fn test_short_parameter_form() {
        let args = SimFsCli::parse_from(["simfs", "info", "-p", "test.img"]);
        assert_eq!(
            args,
            SimFsCli::Info(InfoArgs {
                image_file_path: "test.img".to_string(),
            })
        );
    }
    #[test]
    fn test_long_parameter_form() {
        let args = SimFsCli::parse_from(["simfs", "info", "--image-file-path", "test.img"]);
        assert_eq!(
            args,
            SimFsCli::Info(InfoArgs {
                image_file_path: "test.img".to_string(),
            })
        );
    }
}
