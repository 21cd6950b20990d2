//! Catalog inspection commands.

use tokio::runtime::Runtime;

use super::CatalogArgs;
use crate::db;

/// List known artists with their owned-track counts
pub fn cmd_artists(rt: &Runtime, args: &CatalogArgs) -> anyhow::Result<()> {
    let config = args.load_config();
    rt.block_on(async {
        let pool = db::init_db(&db::db_url(args.db_path(&config))).await?;
        let artists = db::list_artists(&pool).await?;

        if artists.is_empty() {
            println!("No artists in the catalog.");
        }
        for artist in artists {
            println!("{:>6}  {}  ({})", artist.have_tracks, artist.artist_name, artist.artist_id);
        }
        anyhow::Ok(())
    })
}

/// List staged new artists
pub fn cmd_new_artists(rt: &Runtime, args: &CatalogArgs) -> anyhow::Result<()> {
    let config = args.load_config();
    rt.block_on(async {
        let pool = db::init_db(&db::db_url(args.db_path(&config))).await?;
        let names = db::list_new_artists(&pool).await?;

        if names.is_empty() {
            println!("No new artists staged.");
        }
        for name in names {
            println!("{}", name);
        }
        anyhow::Ok(())
    })
}

/// List have entries, optionally for one artist
pub fn cmd_orphans(rt: &Runtime, args: &CatalogArgs, artist: Option<&str>) -> anyhow::Result<()> {
    let config = args.load_config();
    rt.block_on(async {
        let pool = db::init_db(&db::db_url(args.db_path(&config))).await?;
        let entries = db::list_have(&pool, artist).await?;

        for entry in &entries {
            let number = entry
                .track_number
                .map(|n| format!("{:02}", n))
                .unwrap_or_else(|| "--".to_string());
            println!(
                "{} - {} - {} {}\n    {}",
                entry.artist_name, entry.album_title, number, entry.track_title, entry.location
            );
        }
        println!("{} unmatched files", entries.len());
        anyhow::Ok(())
    })
}
