//! Interactive prompt loop
//!
//! Asks for a state, lists its national sites, then lets the user pick a site
//! by number to see places nearby. "back" returns to the state prompt and
//! "exit" (or end of input) quits. Parsing and rendering are plain functions so
//! they can be tested without a terminal or the network.

use std::io::{self, BufRead, Write};

use thiserror::Error;
use tracing::debug;

use crate::data::{
    parse_places, NationalSite, NearbyPlace, PlacesClient, PlacesError, SiteClient, SiteError,
    StateDirectory,
};

/// Prompt for the outer, state-level loop
pub const STATE_PROMPT: &str = "Enter a state name (e.g. Michigan, michigan) or \"exit\" : ";

/// Prompt for the inner, site-level loop
pub const SITE_PROMPT: &str = "Choose the number for detail search or \"exit\" or \"back\": ";

/// Width of the horizontal rules around listings
const RULE_WIDTH: usize = 50;

/// Errors that end an interactive session
#[derive(Debug, Error)]
pub enum ConsoleError {
    /// Reading input or writing output failed
    #[error("Console I/O error: {0}")]
    Io(#[from] io::Error),

    /// Scraping nps.gov failed
    #[error(transparent)]
    Site(#[from] SiteError),

    /// Looking up nearby places failed
    #[error(transparent)]
    Places(#[from] PlacesError),
}

/// What the user asked for at the state prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateCommand {
    /// Quit the program
    Exit,
    /// Show the sites of a known state
    Lookup { name: String, url: String },
    /// Not a state in the directory
    Unknown,
}

/// What the user asked for at the site prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteCommand {
    /// Quit the program
    Exit,
    /// Return to the state prompt
    Back,
    /// Show places near the site at this zero-based index
    Select(usize),
    /// Not a listed number or keyword
    Invalid,
}

/// How the site loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Return to the state prompt
    Back,
    /// Quit the program
    Exit,
}

/// Interprets a line typed at the state prompt. State names match case-insensitively.
pub fn parse_state_input(input: &str, directory: &StateDirectory) -> StateCommand {
    let input = input.trim();
    if input == "exit" {
        return StateCommand::Exit;
    }

    match directory.get(&input.to_lowercase()) {
        Some(url) => StateCommand::Lookup {
            name: input.to_string(),
            url: url.clone(),
        },
        None => StateCommand::Unknown,
    }
}

/// Interprets a line typed at the site prompt, given how many sites are listed
///
/// Sites are numbered from 1.
pub fn parse_site_choice(input: &str, site_count: usize) -> SiteCommand {
    match input.trim() {
        "exit" => SiteCommand::Exit,
        "back" => SiteCommand::Back,
        other => match other.parse::<usize>() {
            Ok(n) if (1..=site_count).contains(&n) => SiteCommand::Select(n - 1),
            _ => SiteCommand::Invalid,
        },
    }
}

fn write_rule<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(out, "{}", "-".repeat(RULE_WIDTH))
}

fn write_header<W: Write>(out: &mut W, title: &str) -> io::Result<()> {
    write_rule(out)?;
    writeln!(out, "{}", title)?;
    write_rule(out)
}

/// Prints the numbered site listing for a state
pub fn write_site_list<W: Write>(
    out: &mut W,
    state_name: &str,
    sites: &[NationalSite],
) -> io::Result<()> {
    write_header(out, &format!("List of national sites in {}", state_name))?;
    for (i, site) in sites.iter().enumerate() {
        writeln!(out, "[{}] {}", i + 1, site.info())?;
    }
    Ok(())
}

/// Prints the places found near a site
pub fn write_places<W: Write>(
    out: &mut W,
    site_name: &str,
    places: &[NearbyPlace],
) -> io::Result<()> {
    write_header(out, &format!("Places near {}", site_name))?;
    for place in places {
        writeln!(out, "{}", place)?;
    }
    Ok(())
}

fn write_unknown_state<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(out, "[Error] Enter a proper state name")?;
    writeln!(out)
}

fn write_invalid_choice<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(out, "[Error] Invalid input")?;
    writeln!(out)?;
    write_rule(out)
}

/// The interactive session: input, output, and the two caching clients
pub struct Console<R, W> {
    input: R,
    output: W,
    sites: SiteClient,
    places: PlacesClient,
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W, sites: SiteClient, places: PlacesClient) -> Self {
        Self {
            input,
            output,
            sites,
            places,
        }
    }

    /// Consumes the console, returning its output sink
    pub fn into_output(self) -> W {
        self.output
    }

    /// Writes `prompt` and reads one line. Returns `None` at end of input.
    fn prompt(&mut self, prompt: &str) -> io::Result<Option<String>> {
        write!(self.output, "{}", prompt)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            writeln!(self.output)?;
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    /// Builds the state directory from the site, then runs the prompt loop
    pub async fn run(&mut self) -> Result<(), ConsoleError> {
        let directory = self.sites.build_state_url_dict().await?;
        self.run_with_directory(&directory).await
    }

    /// Runs the prompt loop against an already-built state directory
    pub async fn run_with_directory(
        &mut self,
        directory: &StateDirectory,
    ) -> Result<(), ConsoleError> {
        loop {
            let Some(line) = self.prompt(STATE_PROMPT)? else {
                return Ok(());
            };

            match parse_state_input(&line, directory) {
                StateCommand::Exit => return Ok(()),
                StateCommand::Unknown => write_unknown_state(&mut self.output)?,
                StateCommand::Lookup { name, url } => {
                    debug!(state = %name, %url, "Listing state");
                    let park_urls = self.sites.get_park_urls(&url).await?;
                    let sites = self.load_sites(&park_urls).await?;
                    write_site_list(&mut self.output, &name, &sites)?;

                    if self.browse_sites(&sites).await? == Flow::Exit {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Loads each park page in turn, printing its cache status as it arrives
    pub async fn load_sites(
        &mut self,
        park_urls: &[String],
    ) -> Result<Vec<NationalSite>, ConsoleError> {
        let mut sites = Vec::with_capacity(park_urls.len());
        for park_url in park_urls {
            let site = self.sites.get_site_instance_with_cache(park_url).await?;
            writeln!(self.output, "{}", site.status)?;
            self.output.flush()?;
            sites.push(site.data);
        }
        Ok(sites)
    }

    /// Runs the site prompt for a listed state until "back", "exit" or end of input
    pub async fn browse_sites(&mut self, sites: &[NationalSite]) -> Result<Flow, ConsoleError> {
        loop {
            let Some(line) = self.prompt(SITE_PROMPT)? else {
                return Ok(Flow::Exit);
            };

            match parse_site_choice(&line, sites.len()) {
                SiteCommand::Exit => return Ok(Flow::Exit),
                SiteCommand::Back => return Ok(Flow::Back),
                SiteCommand::Invalid => write_invalid_choice(&mut self.output)?,
                SiteCommand::Select(index) => {
                    let site = &sites[index];
                    let response = self.places.get_nearby_places_with_cache(site).await?;
                    writeln!(self.output, "{}", response.status)?;
                    let places = parse_places(&response.data)?;
                    write_places(&mut self.output, &site.name, &places)?;
                }
            }
        }
    }
}
