use std::path::PathBuf;

use clap::Parser;

/// Terminal choropleth of contest results, with vote flows between countries.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// (file path) Contest entries: Year, Country, Artist, Song, Place, Normalized_Points.
    #[arg(long, default_value = "data/eurovision_1998_to_2012.csv")]
    pub rows: PathBuf,

    /// (file path) Voting records: Year, Giver, Country, Score.
    #[arg(long, default_value = "data/eurovision_1998_to_2012_voting.csv")]
    pub votes: PathBuf,

    /// (file path) World country polygons as a GeoJSON FeatureCollection.
    #[arg(long, default_value = "data/countries-110m.json")]
    pub world: PathBuf,

    /// (file path, optional) JSON file overriding map settings.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// (file path) Where log output goes; the terminal itself is taken by the map.
    #[arg(long, default_value = "vote-atlas.log")]
    pub log_file: PathBuf,

    /// If passed, turns on debug logging.
    #[arg(long)]
    pub verbose: bool,
}
