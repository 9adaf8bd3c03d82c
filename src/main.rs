use clap::Parser;
use miette::Result;
use pcbpop::cli::{commands, Cli, Commands};

fn main() -> Result<()> {
    // Reset SIGPIPE so piping into `head` and friends exits quietly
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    let global = cli.global;
    pcbpop::logging::init(global.verbose, global.quiet);

    match cli.command {
        Commands::Populate(args) => commands::populate::run(args, &global),
        Commands::Library(cmd) => commands::library::run(cmd, &global),
        Commands::Board(args) => commands::board::run(args, &global),
        Commands::Config(cmd) => commands::config::run(cmd, &global),
        Commands::Template(args) => commands::template::run(args, &global),
        Commands::Completions(args) => commands::completions::run(args),
    }
}
