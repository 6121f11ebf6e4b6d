use std::path::PathBuf;

use anyhow::bail;
use clap::{command, value_parser, Arg, ArgAction, ArgMatches, Command};
use config::Config;
use generator::{generate, Targets};
use renderer::{RendererChoice, RendererStrategy};

mod config;
mod generator;
mod post;
mod renderer;
mod report;

fn cli() -> Command {
    command!()
        .args(&[
            Arg::new("config")
                .short('c')
                .long("config")
                .help("Config file (TOML). notefeed.toml is used when present.")
                .value_parser(value_parser!(PathBuf)),
            Arg::new("notes_dir")
                .long("notes-dir")
                .help("Directory of diary notes")
                .value_parser(value_parser!(PathBuf)),
            Arg::new("renderer")
                .long("renderer")
                .help("Markdown renderer. `auto` uses pandoc when available.")
                .value_parser(RendererChoice::NAMES),
            Arg::new("strict_dates")
                .long("strict-dates")
                .help("Fail on notes whose date does not exist instead of skipping them")
                .action(ArgAction::SetTrue),
        ])
        .subcommand_required(true)
        .subcommand(
            Command::new("build")
                .about("Injects the posts into the blog page and writes the RSS feed")
                .args(&[
                    Arg::new("page")
                        .long("page")
                        .help("Blog page to update. It must contain both entry markers.")
                        .value_parser(value_parser!(PathBuf)),
                    Arg::new("feed")
                        .long("feed")
                        .help("RSS feed to write")
                        .value_parser(value_parser!(PathBuf)),
                    Arg::new("no_page")
                        .long("no-page")
                        .help("Do not touch the blog page")
                        .action(ArgAction::SetTrue),
                    Arg::new("no_feed")
                        .long("no-feed")
                        .help("Do not write the feed")
                        .action(ArgAction::SetTrue),
                ]),
        )
        .subcommand(
            Command::new("check")
                .about("Lists blog candidates without writing anything")
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Print candidates as JSON")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("preview").about("Prints the rendered feed entries without writing anything"),
        )
}

/// Loads the config file and applies the command line on top of it.
fn load_config(matches: &ArgMatches) -> anyhow::Result<Config> {
    let mut config = Config::load(matches.get_one::<PathBuf>("config").map(PathBuf::as_path))?;

    if let Some(dir) = matches.get_one::<PathBuf>("notes_dir") {
        config.notes_dir = config::expand_path(dir);
    }
    if let Some(name) = matches.get_one::<String>("renderer") {
        // the value parser only lets known names through
        if let Some(choice) = RendererChoice::from_name(name) {
            config.renderer = choice;
        }
    }
    if matches.get_flag("strict_dates") {
        config.strict_dates = true;
    }

    Ok(config)
}

fn build(mut config: Config, matches: &ArgMatches) -> anyhow::Result<()> {
    if let Some(page) = matches.get_one::<PathBuf>("page") {
        config.page_path = config::expand_path(page);
    }
    if let Some(feed) = matches.get_one::<PathBuf>("feed") {
        config.feed_path = config::expand_path(feed);
    }
    let targets = Targets {
        page: !matches.get_flag("no_page"),
        feed: !matches.get_flag("no_feed"),
    };
    if !targets.page && !targets.feed {
        bail!("nothing to build: both --no-page and --no-feed were given");
    }

    let strategy = RendererStrategy::select(config.renderer, &config.pandoc)?;
    let summary = generate(&config, strategy, targets, chrono::Utc::now())?;

    if let Some((path, count)) = &summary.page {
        println!(
            "Wrote {count} entr{} into {}",
            if *count == 1 { "y" } else { "ies" },
            path.display()
        );
    }
    println!("Renderer: {}", summary.strategy);
    if let Some((path, count)) = &summary.feed {
        println!("Wrote RSS feed: {} ({count} item(s))", path.display());
    }

    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let matches = cli().get_matches();
    let config = load_config(&matches)?;

    match matches.subcommand() {
        Some(("build", sub)) => build(config, sub)?,
        Some(("check", sub)) => {
            report::check(&config, &mut std::io::stdout().lock(), sub.get_flag("json"))?
        }
        Some(("preview", _)) => {
            let strategy = RendererStrategy::select(config.renderer, &config.pandoc)?;
            let renderer = strategy.build(&config.pandoc);
            report::preview(&config, renderer.as_ref(), &mut std::io::stdout().lock())?;
        }
        _ => unreachable!("clap requires a subcommand"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_is_consistent() {
        cli().debug_assert();
    }

    #[test]
    fn command_line_overrides_config() {
        let matches = cli()
            .try_get_matches_from([
                "notefeed",
                "--config",
                "/nonexistent/notefeed.toml",
                "check",
            ])
            .unwrap();
        assert!(load_config(&matches).is_err());

        let matches = cli()
            .try_get_matches_from([
                "notefeed",
                "--notes-dir",
                "/tmp/notes",
                "--renderer",
                "commonmark",
                "--strict-dates",
                "build",
                "--no-feed",
            ])
            .unwrap();
        let config = load_config(&matches).unwrap();
        assert_eq!(config.notes_dir, PathBuf::from("/tmp/notes"));
        assert_eq!(config.renderer, RendererChoice::CommonMark);
        assert!(config.strict_dates);
        let (_, sub) = matches.subcommand().unwrap();
        assert!(sub.get_flag("no_feed"));
    }

    #[test]
    fn unknown_renderer_is_rejected() {
        assert!(cli()
            .try_get_matches_from(["notefeed", "--renderer", "markdown", "build"])
            .is_err());
    }
}
