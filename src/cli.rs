//! Command-line interface definitions for the ticker news crawler.
//!
//! Flags override the optional YAML config file. The database URL can also
//! come from the `DATABASE_URL` environment variable.

use crate::sites::Site;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Which sites a run covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SiteChoice {
    Bloomberg,
    Investing,
    #[value(name = "investnews")]
    InvestNews,
    All,
}

impl SiteChoice {
    pub fn sites(self) -> Vec<Site> {
        match self {
            SiteChoice::Bloomberg => vec![Site::Bloomberg],
            SiteChoice::Investing => vec![Site::Investing],
            SiteChoice::InvestNews => vec![Site::InvestNews],
            SiteChoice::All => Site::ALL.to_vec(),
        }
    }
}

/// Crawl Brazilian financial news for one ticker into PostgreSQL.
///
/// # Examples
///
/// ```sh
/// # Every site, Vale, default database from the environment
/// ticker_news_crawler --ticker vale3 --search-term vale
///
/// # One site, small run, nothing written
/// ticker_news_crawler --site investnews --ticker csna3 --page-budget 3 --dry-run
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Site to crawl
    #[arg(short, long, value_enum, default_value_t = SiteChoice::All)]
    pub site: SiteChoice,

    /// Ticker the stored articles are tagged with
    #[arg(short, long, default_value = "vale3")]
    pub ticker: String,

    /// Search term for sites with a search page (defaults to the ticker)
    #[arg(long)]
    pub search_term: Option<String>,

    /// PostgreSQL connection URL
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Worker count, overriding every site's default
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Number of listing pages to walk
    #[arg(long)]
    pub page_budget: Option<usize>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Keep articles in memory instead of writing to the database
    #[arg(long)]
    pub dry_run: bool,

    /// Optional path to a YAML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

impl Cli {
    pub fn search_term(&self) -> &str {
        self.search_term.as_deref().unwrap_or(&self.ticker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["ticker_news_crawler"]);
        assert_eq!(cli.site, SiteChoice::All);
        assert_eq!(cli.ticker, "vale3");
        assert_eq!(cli.search_term(), "vale3");
        assert!(!cli.dry_run);
        assert!(cli.workers.is_none());
    }

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from([
            "ticker_news_crawler",
            "--site",
            "investnews",
            "--ticker",
            "csna3",
            "--search-term",
            "csn",
            "--page-budget",
            "3",
            "--dry-run",
            "--database-url",
            "postgres://localhost/news",
        ]);

        assert_eq!(cli.site.sites(), vec![Site::InvestNews]);
        assert_eq!(cli.search_term(), "csn");
        assert_eq!(cli.page_budget, Some(3));
        assert!(cli.dry_run);
        assert_eq!(cli.database_url.as_deref(), Some("postgres://localhost/news"));
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from([
            "ticker_news_crawler",
            "-s",
            "bloomberg",
            "-t",
            "petr4",
            "-w",
            "2",
            "-c",
            "/tmp/crawler.yaml",
        ]);

        assert_eq!(cli.site, SiteChoice::Bloomberg);
        assert_eq!(cli.ticker, "petr4");
        assert_eq!(cli.workers, Some(2));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/crawler.yaml")));
    }

    #[test]
    fn test_all_covers_every_site() {
        assert_eq!(SiteChoice::All.sites(), Site::ALL.to_vec());
    }

    #[test]
    fn test_unknown_site_is_rejected() {
        assert!(Cli::try_parse_from(["ticker_news_crawler", "--site", "valor"]).is_err());
    }
}
