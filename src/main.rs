use clap::Parser;
use simfs::cli_interface::SimFsCli;
/// a CLI interface to create a partition image or inspect an existing one
fn main() -> anyhow::Result<()> {
    env_logger::builder().format_timestamp_nanos().init();
    let args = SimFsCli::parse();
    match args {
        SimFsCli::Mkfs(args) => {
            simfs::mkfs::mkfs(args.image_file_path, args.force)?;
        }
        SimFsCli::Info(args) => {
            println!("{}", simfs::fsinfo::describe(args.image_file_path)?);
        }
    }
    Ok(())
}
