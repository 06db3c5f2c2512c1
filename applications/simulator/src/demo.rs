/// Demo playlist written on first run
use cadence_core::{Album, Provider, Song};

/// A small mixed-provider playlist with preview windows
pub fn demo_playlist() -> Vec<Song> {
    vec![
        Song::new(Provider::Netease, "29829683", "Chiisana Koi no Uta")
            .with_artist("MONGOL800")
            .with_duration(326.0)
            .with_peak_start(62.0),
        Song::new(Provider::Kugou, "4f2a91c0", "Ordinary Road")
            .with_artist("Pu Shu")
            .with_duration(271.0)
            .with_peak_start(95.0),
        Song::new(Provider::Xiami, "1769402281", "Night Drive")
            .with_artist("Dusk Radio")
            .with_artist("Kaede")
            .with_duration(204.0),
        Song {
            album: Some(Album {
                id: "3494315".to_string(),
                name: "Live at Budokan".to_string(),
                img: None,
            }),
            ..Song::new(Provider::Netease, "5264842", "Starlight Encore")
                .with_artist("Aurora Lines")
                .with_duration(298.0)
                .with_peak_start(140.0)
        },
    ]
}
