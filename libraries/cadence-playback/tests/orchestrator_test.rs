//! Integration tests for the player orchestrator
//!
//! Drive the orchestrator the way a host does: commands in, native events
//! tagged with session ids, and observe the process-wide streams.

mod common;

use cadence_core::{PeakConfigPatch, PeakUpdate, PlayMode, Status};
use cadence_playback::{
    Command, EventData, EventKind, NativeEvent, PlaybackError, PlaybackEvent, PlayerConfig,
    PlayerEvent, PlayerOrchestrator, Topic,
};
use common::{config, player, received, song_changes, FakeBackend, MediaCall};

// ===== Starting Playback =====

#[test]
fn play_at_starts_session_and_reports_play() {
    let backend = FakeBackend::new();
    let mut player = player(&config(PlayMode::Full), &backend, 3);
    let mut changes = player.subscribe(Topic::SongChange);
    let mut plays = player.subscribe(Topic::Play);

    player.play_at(1).unwrap();
    assert_eq!(player.status(), Status::Loading);
    assert_eq!(player.current_index(), Some(1));

    let session = player.active_session_id().unwrap();
    assert_eq!(
        backend.calls(session),
        vec![MediaCall::Volume(0.8), MediaCall::Play]
    );

    // Status follows the resource, not the request
    assert!(player.handle_native(session, NativeEvent::Play));
    assert_eq!(player.status(), Status::Playing);

    let song = player.current_song().unwrap().key();
    assert_eq!(
        received(&mut plays),
        vec![PlayerEvent::Playback {
            session,
            song: song.clone(),
            event: PlaybackEvent::bare(EventKind::Play),
        }]
    );
    assert_eq!(
        received(&mut changes),
        vec![PlayerEvent::SongChanged {
            index: 1,
            song,
            previous: None,
        }]
    );
}

#[test]
fn peak_mode_seeks_to_peak_start() {
    let backend = FakeBackend::new();
    let mut player = player(&config(PlayMode::Peak), &backend, 2);

    player.play_at(0).unwrap();
    let session = player.active_session_id().unwrap();
    assert_eq!(
        backend.calls(session),
        vec![
            MediaCall::Volume(0.8),
            MediaCall::Seek(60.0),
            MediaCall::Play
        ]
    );
    assert_eq!(player.active_session().unwrap().peak_start_time(), Some(60.0));
}

#[test]
fn full_mode_ignores_peak_start() {
    let backend = FakeBackend::new();
    let mut player = player(&config(PlayMode::Full), &backend, 1);

    player.play_at(0).unwrap();
    let session = player.active_session_id().unwrap();
    assert!(!backend
        .calls(session)
        .iter()
        .any(|call| matches!(call, MediaCall::Seek(_))));
    assert_eq!(player.active_session().unwrap().peak_start_time(), None);
}

// ===== Navigation =====

#[test]
fn next_releases_previous_session_and_drops_its_events() {
    let backend = FakeBackend::new();
    let mut player = player(&config(PlayMode::Full), &backend, 3);
    let mut changes = player.subscribe(Topic::SongChange);

    player.play_at(0).unwrap();
    let first = player.active_session_id().unwrap();
    player.next().unwrap();
    let second = player.active_session_id().unwrap();

    assert_ne!(first, second);
    assert_eq!(backend.calls(first).last(), Some(&MediaCall::Release));
    assert_eq!(backend.opened(), vec!["s0", "s1"]);

    // A late event from the released resource changes nothing
    assert!(!player.handle_native(first, NativeEvent::Play));
    assert_eq!(player.status(), Status::Loading);

    let events = received(&mut changes);
    assert_eq!(events.len(), 2);
    assert!(matches!(
        &events[1],
        PlayerEvent::SongChanged { index: 1, previous: Some(previous), .. } if previous.id == "s0"
    ));
}

#[test]
fn navigation_wraps_both_ways() {
    let backend = FakeBackend::new();
    let mut player = player(&config(PlayMode::Full), &backend, 3);
    let mut changes = player.subscribe(Topic::SongChange);

    player.play_at(2).unwrap();
    player.next().unwrap();
    assert_eq!(player.current_index(), Some(0));
    player.previous().unwrap();
    assert_eq!(player.current_index(), Some(2));

    assert_eq!(song_changes(&mut changes), vec![2, 0, 2]);
}

#[test]
fn play_at_out_of_range_is_rejected() {
    let backend = FakeBackend::new();
    let mut player = player(&config(PlayMode::Full), &backend, 3);
    player.play_at(1).unwrap();
    let session = player.active_session_id();
    let mut changes = player.subscribe(Topic::SongChange);

    assert!(matches!(
        player.play_at(3),
        Err(PlaybackError::IndexOutOfBounds { index: 3, len: 3 })
    ));
    assert_eq!(player.current_index(), Some(1));
    assert_eq!(player.active_session_id(), session);
    assert!(received(&mut changes).is_empty());
}

// ===== Failures =====

#[test]
fn missing_resource_is_reported_as_error_event() {
    let backend = FakeBackend::new();
    backend.set_missing("s0");
    let mut player = player(&config(PlayMode::Full), &backend, 2);
    let mut errors = player.subscribe(Topic::Error);

    // The command itself succeeds
    player.play_at(0).unwrap();

    let events = received(&mut errors);
    assert_eq!(events.len(), 1);
    let PlayerEvent::Playback { event, song, .. } = &events[0] else {
        panic!("expected a playback event, got {:?}", events[0]);
    };
    assert_eq!(song.id, "s0");
    assert_eq!(event.event, EventKind::Error);
    assert!(matches!(
        &event.data,
        Some(EventData::Error { message }) if message == "no playable resource"
    ));
    assert_eq!(player.status(), Status::Stopped);
}

#[test]
fn rejected_play_is_reported_as_error_event() {
    let backend = FakeBackend::new();
    backend.set_rejecting("s0");
    let mut player = player(&config(PlayMode::Full), &backend, 1);
    let mut errors = player.subscribe(Topic::Error);

    player.play_at(0).unwrap();

    let events = received(&mut errors);
    assert_eq!(events.len(), 1);
    assert!(matches!(
        &events[0],
        PlayerEvent::Playback { event, .. }
            if matches!(&event.data, Some(EventData::Error { message }) if message.contains("decode error"))
    ));
}

#[test]
fn ended_stops_and_closes_session() {
    let backend = FakeBackend::new();
    let mut player = player(&config(PlayMode::Full), &backend, 2);
    let mut ended = player.subscribe(Topic::Ended);

    player.play_at(0).unwrap();
    let session = player.active_session_id().unwrap();
    player.handle_native(session, NativeEvent::Play);
    assert!(player.handle_native(session, NativeEvent::Ended));

    assert_eq!(player.status(), Status::Stopped);
    assert_eq!(received(&mut ended).len(), 1);

    // The session is finished; nothing more comes out of it
    assert!(!player.handle_native(
        session,
        NativeEvent::Error {
            message: "late".to_string()
        }
    ));
}

// ===== Boundaries =====

#[test]
fn layout_signals_are_broadcast_once() {
    let backend = FakeBackend::new();
    let mut player = player(&config(PlayMode::Peak), &backend, 2);
    let mut touches = player.subscribe(Topic::LayoutTouch);
    let mut boundaries = player.subscribe(Topic::LayoutEnded);

    player.play_at(0).unwrap();
    let session = player.active_session_id().unwrap();

    // peak 60 + 30 + 5 = 95, lookahead 2
    for t in [61.0, 80.0, 92.9] {
        player.handle_native(session, NativeEvent::TimeUpdate { current_time: t });
    }
    assert!(received(&mut touches).is_empty());

    player.handle_native(session, NativeEvent::TimeUpdate { current_time: 93.0 });
    player.handle_native(session, NativeEvent::TimeUpdate { current_time: 94.0 });
    let touched = received(&mut touches);
    assert_eq!(touched.len(), 1);
    assert!(matches!(
        &touched[0],
        PlayerEvent::Playback { event, .. } if event.current_time() == Some(93.0)
    ));
    assert!(received(&mut boundaries).is_empty());

    player.handle_native(session, NativeEvent::TimeUpdate { current_time: 95.0 });
    player.handle_native(session, NativeEvent::TimeUpdate { current_time: 96.0 });
    assert_eq!(received(&mut boundaries).len(), 1);
}

#[test]
fn lay_out_pause_advances_to_next_preview() {
    let backend = FakeBackend::new();
    let mut player = player(&config(PlayMode::Peak), &backend, 3);

    player.play_at(0).unwrap();
    let first = player.active_session_id().unwrap();
    player.lay_out_pause().unwrap();

    assert!(backend.calls(first).contains(&MediaCall::Pause));
    assert_eq!(player.current_index(), Some(1));
    assert_eq!(player.status(), Status::Loading);
}

#[test]
fn lay_out_pause_can_stay_on_song() {
    let backend = FakeBackend::new();
    let config = PlayerConfig {
        advance_after_preview: false,
        ..config(PlayMode::Peak)
    };
    let mut player = player(&config, &backend, 3);

    player.play_at(0).unwrap();
    let session = player.active_session_id();
    player.lay_out_pause().unwrap();

    assert_eq!(player.current_index(), Some(0));
    assert_eq!(player.active_session_id(), session);
    assert_eq!(player.status(), Status::Paused);
}

#[test]
fn change_peak_applies_now_and_to_later_songs() {
    let backend = FakeBackend::new();
    let mut player = player(&config(PlayMode::Peak), &backend, 2);
    player.play_at(0).unwrap();

    player.change_peak(&PeakUpdate {
        peak_start_time: None,
        peak_config: Some(PeakConfigPatch {
            duration: Some(10.0),
            ..PeakConfigPatch::default()
        }),
    });
    assert_eq!(player.active_session().unwrap().peak_config().duration, 10.0);
    assert_eq!(player.active_session().unwrap().end_time(), Some(75.0));

    player.next().unwrap();
    let session = player.active_session().unwrap();
    assert_eq!(session.peak_config().duration, 10.0);
    assert_eq!(session.peak_config().lay_out, 2.0);
}

// ===== Transport =====

#[test]
fn pause_and_resume() {
    let backend = FakeBackend::new();
    let mut player = player(&config(PlayMode::Full), &backend, 1);
    player.play_at(0).unwrap();
    let session = player.active_session_id().unwrap();
    player.handle_native(session, NativeEvent::Play);

    assert!(player.pause());
    assert_eq!(player.status(), Status::Paused);

    assert!(player.play());
    // Still paused until the resource accepts
    assert_eq!(player.status(), Status::Paused);
    player.handle_native(session, NativeEvent::Play);
    assert_eq!(player.status(), Status::Playing);

    let plays = backend
        .calls(session)
        .into_iter()
        .filter(|call| *call == MediaCall::Play)
        .count();
    assert_eq!(plays, 2);
}

#[test]
fn repeated_play_while_loading_broadcasts_once() {
    let backend = FakeBackend::new();
    let mut player = player(&config(PlayMode::Full), &backend, 1);
    let mut plays = player.subscribe(Topic::Play);
    let mut played = player.subscribe(Topic::Played);

    player.play_at(0).unwrap();
    assert!(player.play());
    assert!(player.play());
    assert_eq!(player.status(), Status::Loading);

    let session = player.active_session_id().unwrap();
    player.handle_native(session, NativeEvent::Play);
    player.handle_native(session, NativeEvent::Playing);

    assert_eq!(received(&mut plays).len(), 1);
    assert_eq!(received(&mut played).len(), 1);

    // Fired watchers are re-armed for the next request
    player.pause();
    assert!(player.play());
    player.handle_native(session, NativeEvent::Play);
    assert_eq!(received(&mut plays).len(), 1);
}

#[test]
fn toggle_play() {
    let backend = FakeBackend::new();
    let mut player = player(&config(PlayMode::Full), &backend, 2);

    // Nothing loaded: starts the first song
    player.toggle_play().unwrap();
    assert_eq!(player.current_index(), Some(0));
    let session = player.active_session_id().unwrap();
    player.handle_native(session, NativeEvent::Play);

    player.toggle_play().unwrap();
    assert_eq!(player.status(), Status::Paused);

    player.toggle_play().unwrap();
    player.handle_native(session, NativeEvent::Play);
    assert_eq!(player.status(), Status::Playing);
}

#[test]
fn transport_without_session_is_noop() {
    let backend = FakeBackend::new();
    let mut player = player(&config(PlayMode::Full), &backend, 2);

    assert!(!player.play());
    assert!(!player.pause());
    assert!(backend.opened().is_empty());
    assert_eq!(player.status(), Status::Stopped);
}

#[test]
fn volume_is_clamped_and_applied() {
    let backend = FakeBackend::new();
    let mut player = player(&config(PlayMode::Full), &backend, 1);
    player.play_at(0).unwrap();
    let session = player.active_session_id().unwrap();

    player.set_volume(1.7);
    assert_eq!(player.volume(), 1.0);
    assert_eq!(backend.calls(session).last(), Some(&MediaCall::Volume(1.0)));

    player.set_volume(0.25);
    player.next().unwrap();
    let next = player.active_session_id().unwrap();
    assert_eq!(backend.calls(next).first(), Some(&MediaCall::Volume(0.25)));
}

// ===== Playlist =====

#[test]
fn remove_current_while_playing_starts_replacement() {
    let backend = FakeBackend::new();
    let mut player = player(&config(PlayMode::Full), &backend, 3);
    player.play_at(1).unwrap();
    let old = player.active_session_id().unwrap();
    player.handle_native(old, NativeEvent::Play);

    let mut lists = player.subscribe(Topic::SongListChange);
    let mut changes = player.subscribe(Topic::SongChange);

    let removed = player.remove(1).unwrap();
    assert_eq!(removed.id, "s1");
    assert_eq!(
        received(&mut lists),
        vec![PlayerEvent::SongListChanged { length: 2 }]
    );

    assert_eq!(player.current_song().unwrap().id, "s2");
    assert_ne!(player.active_session_id(), Some(old));
    assert_eq!(backend.calls(old).last(), Some(&MediaCall::Release));
    assert_eq!(player.status(), Status::Loading);

    let events = received(&mut changes);
    assert!(matches!(
        &events[..],
        [PlayerEvent::SongChanged { index: 1, song, previous: Some(previous) }]
            if song.id == "s2" && previous.id == "s1"
    ));
}

#[test]
fn remove_current_while_paused_stops() {
    let backend = FakeBackend::new();
    let mut player = player(&config(PlayMode::Full), &backend, 3);
    player.play_at(0).unwrap();
    let session = player.active_session_id().unwrap();
    player.handle_native(session, NativeEvent::Play);
    player.pause();

    player.remove(0).unwrap();
    assert_eq!(player.active_session_id(), None);
    assert_eq!(player.status(), Status::Stopped);
    assert_eq!(player.current_song().unwrap().id, "s1");
}

#[test]
fn remove_other_song_keeps_session() {
    let backend = FakeBackend::new();
    let mut player = player(&config(PlayMode::Full), &backend, 3);
    player.play_at(2).unwrap();
    let session = player.active_session_id();

    player.remove(0).unwrap();
    assert_eq!(player.active_session_id(), session);
    assert_eq!(player.current_index(), Some(1));
    assert_eq!(player.current_song().unwrap().id, "s2");
}

#[test]
fn move_item_keeps_current_song() {
    let backend = FakeBackend::new();
    let mut player = player(&config(PlayMode::Full), &backend, 3);
    player.play_at(0).unwrap();
    let session = player.active_session_id();
    let mut lists = player.subscribe(Topic::SongListChange);

    player.move_item(0, 2).unwrap();
    assert_eq!(player.current_index(), Some(2));
    assert_eq!(player.current_song().unwrap().id, "s0");
    assert_eq!(player.active_session_id(), session);
    assert_eq!(
        received(&mut lists),
        vec![PlayerEvent::SongListChanged { length: 3 }]
    );

    assert!(player.move_item(0, 5).is_err());
    assert!(received(&mut lists).is_empty());
}

#[test]
fn set_playlist_releases_session() {
    let backend = FakeBackend::new();
    let mut player = player(&config(PlayMode::Full), &backend, 3);
    player.play_at(0).unwrap();
    let session = player.active_session_id().unwrap();
    let mut lists = player.subscribe(Topic::SongListChange);

    player.set_playlist(common::songs(5));
    assert_eq!(player.active_session_id(), None);
    assert_eq!(player.current_index(), None);
    assert_eq!(player.status(), Status::Stopped);
    assert_eq!(backend.calls(session).last(), Some(&MediaCall::Release));
    assert_eq!(
        received(&mut lists),
        vec![PlayerEvent::SongListChanged { length: 5 }]
    );
}

#[test]
fn locate_reports_current_index() {
    let backend = FakeBackend::new();
    let mut player = player(&config(PlayMode::Full), &backend, 3);
    let mut locate = player.subscribe(Topic::Locate);

    player.locate();
    player.play_at(2).unwrap();
    player.locate();

    assert_eq!(
        received(&mut locate),
        vec![
            PlayerEvent::Located { index: None },
            PlayerEvent::Located { index: Some(2) },
        ]
    );
}

// ===== Session Streams =====

#[test]
fn session_streams_end_with_the_session() {
    let backend = FakeBackend::new();
    let mut player = player(&config(PlayMode::Full), &backend, 2);
    player.play_at(0).unwrap();
    let session = player.active_session_id().unwrap();

    let mut ticks = player.subscribe_session(EventKind::TimeUpdate).unwrap();
    player.handle_native(session, NativeEvent::TimeUpdate { current_time: 1.0 });
    player.handle_native(session, NativeEvent::TimeUpdate { current_time: 2.0 });
    assert_eq!(ticks.drain().len(), 2);

    player.next().unwrap();
    assert!(ticks.drain().is_empty());
    assert!(ticks.is_terminated());
}

#[test]
fn execute_dispatches_commands() {
    let backend = FakeBackend::new();
    let mut player = PlayerOrchestrator::new(&config(PlayMode::Full), Box::new(backend.clone()));

    player
        .execute(Command::SetPlaylist {
            songs: common::songs(3),
        })
        .unwrap();
    player.execute(Command::PlayAt { index: 2 }).unwrap();
    player.execute(Command::SetVolume { volume: 0.5 }).unwrap();
    player
        .execute(Command::SetMode {
            mode: PlayMode::Peak,
        })
        .unwrap();

    assert_eq!(player.current_index(), Some(2));
    assert_eq!(player.volume(), 0.5);
    assert_eq!(player.mode(), PlayMode::Peak);
    assert!(player.execute(Command::PlayAt { index: 9 }).is_err());
    assert!(player.execute(Command::Seek { position: 12.0 }).is_ok());
}
