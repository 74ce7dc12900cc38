use std::fs;
use std::path::Path;
use std::sync::Arc;

use tempfile::{TempDir, tempdir};

use crate::codec::flac;
use crate::config::Settings;
use crate::error::Error;
use crate::library::{MemoryStore, Store, scan};
use crate::testutil::flac_stream;

use super::mount::{Attr, DIR_SIZE, MountContext};

const AUDIO: &[u8] = b"\xff\xf8left channel right channel";

fn flac_file(fields: &[(&str, &str)], pad: usize) -> Vec<u8> {
    flac_stream(fields, pad, AUDIO)
}

fn write_collection(dir: &Path) {
    fs::write(
        dir.join("a.flac"),
        flac_file(
            &[
                ("TITLE", "T"),
                ("ARTIST", "A"),
                ("ALBUM", "B"),
                ("GENRE", "Rock"),
                ("DATE", "2001"),
                ("TRACKNUMBER", "1"),
            ],
            64,
        ),
    )
    .unwrap();
    fs::write(
        dir.join("b.flac"),
        flac_file(
            &[
                ("TITLE", "U"),
                ("ALBUM", "C"),
                ("GENRE", "Rock"),
                ("ARTIST", ""),
                ("DATE", "1999"),
                ("TRACKNUMBER", "2"),
            ],
            32,
        ),
    )
    .unwrap();
    fs::write(dir.join("loose.mp3"), b"not a real mp3 frame stream").unwrap();
    fs::write(dir.join("broken.flac"), b"fLaC broken beyond repair").unwrap();
}

fn settings() -> Settings {
    let mut settings = Settings::default();
    settings.mount.template = "$artist/$album ($year)/$track - $title.$format".to_string();
    settings
}

fn mount() -> (TempDir, Arc<MemoryStore>, MountContext) {
    let dir = tempdir().unwrap();
    write_collection(dir.path());
    let settings = settings();
    let store = Arc::new(MemoryStore::new(scan(dir.path(), &settings.library)));
    let ctx = MountContext::new(&settings, store.clone()).unwrap();
    (dir, store, ctx)
}

#[test]
fn scan_skips_undecodable_file() {
    let dir = tempdir().unwrap();
    write_collection(dir.path());
    let items = scan(dir.path(), &settings().library);
    assert_eq!(items.len(), 3);
    assert!(items.iter().all(|i| !i.path.ends_with("broken.flac")));
}

#[test]
fn tree_projects_template_paths() {
    let (_dir, _store, ctx) = mount();

    let mut root = ctx.read_dir("/").unwrap();
    root.sort();
    assert_eq!(root, ["A", "Unknown Artist"]);

    assert_eq!(ctx.read_dir("/A").unwrap(), ["B (2001)"]);
    assert_eq!(ctx.read_dir("/A/B (2001)").unwrap(), ["01 - T.flac"]);
    assert!(matches!(ctx.attr("/").unwrap(), Attr::Dir));
    assert!(matches!(ctx.attr("/A/B (2001)").unwrap(), Attr::Dir));
    assert!(matches!(
        ctx.attr("/A/B (2001)/01 - T.flac").unwrap(),
        Attr::File { .. }
    ));

    // Both the empty-artist flac and the untagged mp3 fell back.
    assert_eq!(
        ctx.read_dir("/Unknown Artist").unwrap(),
        ["C (1999)", "Unknown Album (Unknown Year)"]
    );
    assert_eq!(
        ctx.read_dir("/Unknown Artist/C (1999)").unwrap(),
        ["02 - U.flac"]
    );
    assert_eq!(
        ctx.read_dir("/Unknown Artist/Unknown Album (Unknown Year)")
            .unwrap(),
        ["00 - loose.mp3"]
    );
}

#[test]
fn missing_paths_are_not_found() {
    let (_dir, _store, ctx) = mount();
    assert!(matches!(ctx.attr("/nope"), Err(Error::NotFound)));
    assert!(matches!(ctx.read_dir("/nope"), Err(Error::NotFound)));
    // Deeper than the template: never a file, never a directory.
    assert!(matches!(
        ctx.attr("/A/B (2001)/01 - T.flac/extra"),
        Err(Error::NotFound)
    ));
    assert!(matches!(
        ctx.read_dir("/A/B (2001)/01 - T.flac"),
        Err(Error::NotADirectory)
    ));
    assert!(matches!(ctx.open("/A"), Err(Error::NotAFile)));
}

#[test]
fn file_attr_reports_real_size() {
    let (dir, _store, ctx) = mount();
    let real_len = fs::metadata(dir.path().join("a.flac")).unwrap().len();
    match ctx.attr("/A/B (2001)/01 - T.flac").unwrap() {
        Attr::File { size, real } => {
            assert_eq!(size, real_len);
            assert_eq!(real.len(), real_len);
        }
        Attr::Dir => panic!("expected a file"),
    }
    assert_eq!(ctx.attr("/A/B (2001)/01 - T.flac").unwrap().size(), real_len);
    assert_eq!(ctx.attr("/A").unwrap().size(), DIR_SIZE);
}

#[test]
fn fresh_open_reads_back_the_original_bytes() {
    let (dir, _store, ctx) = mount();
    let original = fs::read(dir.path().join("a.flac")).unwrap();

    let h = ctx.open("/A/B (2001)/01 - T.flac").unwrap();
    let all = ctx.read(h, original.len(), 0).unwrap();
    assert_eq!(all, original);

    // Reads at end of stream are empty, not an error.
    assert!(ctx.read(h, 16, original.len() as u64).unwrap().is_empty());
    ctx.release(h).unwrap();
}

#[test]
fn reads_splice_cleanly_across_the_boundary() {
    let (_dir, _store, ctx) = mount();
    let h = ctx.open("/A/B (2001)/01 - T.flac").unwrap();
    let boundary = ctx.boundary(h).unwrap();
    let full = ctx.read(h, usize::MAX / 2, 0).unwrap();

    for (offset, size) in [
        (0, full.len()),
        (boundary - 3, 7),
        (boundary - 1, 2),
        (0, boundary as usize + 1),
        (boundary, 4),
        (boundary + 2, 8),
    ] {
        let expect_end = (offset as usize + size).min(full.len());
        assert_eq!(
            ctx.read(h, size, offset).unwrap(),
            &full[offset as usize..expect_end],
            "offset {offset} size {size}"
        );
    }
    ctx.release(h).unwrap();
}

#[test]
fn oversized_read_lengths_do_not_overflow() {
    let (_dir, _store, ctx) = mount();
    let h = ctx.open("/A/B (2001)/01 - T.flac").unwrap();
    let boundary = ctx.boundary(h).unwrap();

    let full = ctx.read(h, usize::MAX, 0).unwrap();
    assert_eq!(ctx.read(h, usize::MAX, 5).unwrap(), &full[5..]);
    assert_eq!(
        ctx.read(h, usize::MAX, boundary + 3).unwrap(),
        &full[boundary as usize + 3..]
    );
    ctx.release(h).unwrap();
}

#[test]
fn racing_opens_converge_on_shared_state() {
    let (_dir, _store, ctx) = mount();
    let path = "/A/B (2001)/01 - T.flac";

    let handles: Vec<u64> = std::thread::scope(|s| {
        let spawned: Vec<_> = (0..4).map(|_| s.spawn(|| ctx.open(path).unwrap())).collect();
        spawned.into_iter().map(|t| t.join().unwrap()).collect()
    });

    // A write through one handle is visible through all the others.
    let new_header = retagged_header(&ctx, handles[0], "Shared");
    ctx.write(handles[0], 0, &new_header).unwrap();
    for &h in &handles[1..] {
        assert_eq!(ctx.read(h, new_header.len(), 0).unwrap(), new_header);
    }
    for h in handles {
        ctx.release(h).unwrap();
    }
}

#[test]
fn mp3_passes_through_with_zero_boundary() {
    let (dir, _store, ctx) = mount();
    let original = fs::read(dir.path().join("loose.mp3")).unwrap();

    let h = ctx
        .open("/Unknown Artist/Unknown Album (Unknown Year)/00 - loose.mp3")
        .unwrap();
    assert_eq!(ctx.boundary(h).unwrap(), 0);
    assert_eq!(ctx.read(h, original.len(), 0).unwrap(), original);
    assert!(matches!(
        ctx.write(h, 0, b"tagdata"),
        Err(Error::ReadOnlyRegion { boundary: 0, .. })
    ));
    ctx.release(h).unwrap();
}

/// Simulate an external tagger: read the header region, rewrite one
/// field with the codec, write the new header bytes back at offset 0.
fn retagged_header(ctx: &MountContext, h: u64, title: &str) -> Vec<u8> {
    let boundary = ctx.boundary(h).unwrap() as usize;
    let header = ctx.read(h, boundary, 0).unwrap();
    let mut tags = flac::decode(&header).unwrap();
    let mut comments = tags.comments().unwrap();
    comments.set("TITLE", title);
    tags.set_comments(&comments);
    flac::encode(&tags, boundary).unwrap()
}

#[test]
fn header_write_persists_tags_to_the_store() {
    let (_dir, store, ctx) = mount();
    let h = ctx.open("/A/B (2001)/01 - T.flac").unwrap();
    let boundary = ctx.boundary(h).unwrap();

    let new_header = retagged_header(&ctx, h, "Renamed");
    assert_eq!(ctx.write(h, 0, &new_header).unwrap(), new_header.len());

    // Boundary is stable: the header re-encodes into the same extent.
    assert_eq!(ctx.boundary(h).unwrap(), boundary);

    let item = store
        .items()
        .into_iter()
        .find(|i| i.path.ends_with("a.flac"))
        .unwrap();
    assert_eq!(item.title, "Renamed");
    assert_eq!(item.artist, "A");

    // The virtual stream now serves the new header.
    let reread = ctx.read(h, new_header.len(), 0).unwrap();
    assert_eq!(reread, new_header);
    ctx.release(h).unwrap();
}

#[test]
fn rewriting_current_values_changes_nothing() {
    let (_dir, _store, ctx) = mount();
    let h = ctx.open("/A/B (2001)/01 - T.flac").unwrap();
    let boundary = ctx.boundary(h).unwrap() as usize;
    let before = ctx.read(h, boundary, 0).unwrap();

    assert_eq!(ctx.write(h, 0, &before).unwrap(), before.len());

    assert_eq!(ctx.boundary(h).unwrap() as usize, boundary);
    assert_eq!(ctx.read(h, boundary, 0).unwrap(), before);
    ctx.release(h).unwrap();
}

#[test]
fn failed_write_leaves_everything_untouched() {
    let (_dir, store, ctx) = mount();
    let h = ctx.open("/A/B (2001)/01 - T.flac").unwrap();
    let before = ctx.read(h, usize::MAX / 2, 0).unwrap();

    assert!(matches!(
        ctx.write(h, 0, b"XXXXXXXX"),
        Err(Error::TagDecode(_))
    ));

    assert_eq!(ctx.read(h, usize::MAX / 2, 0).unwrap(), before);
    let item = store
        .items()
        .into_iter()
        .find(|i| i.path.ends_with("a.flac"))
        .unwrap();
    assert_eq!(item.title, "T");
    ctx.release(h).unwrap();
}

#[test]
fn writes_into_the_audio_region_are_rejected() {
    let (_dir, _store, ctx) = mount();
    let h = ctx.open("/A/B (2001)/01 - T.flac").unwrap();
    let boundary = ctx.boundary(h).unwrap();
    assert!(matches!(
        ctx.write(h, boundary, b"samples"),
        Err(Error::ReadOnlyRegion { offset, boundary: b }) if offset == boundary && b == boundary
    ));
    ctx.release(h).unwrap();
}

#[test]
fn open_state_lives_until_the_last_release() {
    let (_dir, _store, ctx) = mount();
    let path = "/A/B (2001)/01 - T.flac";
    let h1 = ctx.open(path).unwrap();
    let h2 = ctx.open(path).unwrap();
    assert_ne!(h1, h2);

    ctx.release(h1).unwrap();
    // Second handle still serves the shared state.
    assert!(!ctx.read(h2, 4, 0).unwrap().is_empty());
    // The released handle is gone for good.
    assert!(matches!(ctx.read(h1, 4, 0), Err(Error::StaleHandle(_))));

    ctx.release(h2).unwrap();
    assert!(matches!(ctx.release(h2), Err(Error::StaleHandle(_))));

    // A fresh open starts new state.
    let h3 = ctx.open(path).unwrap();
    assert!(!ctx.read(h3, 4, 0).unwrap().is_empty());
    ctx.release(h3).unwrap();
}

#[test]
fn namespace_mutations_are_uniformly_unsupported() {
    let (_dir, _store, ctx) = mount();
    assert!(matches!(
        ctx.create("/A/new.flac"),
        Err(Error::Unsupported("create"))
    ));
    assert!(matches!(
        ctx.remove("/A/B (2001)/01 - T.flac"),
        Err(Error::Unsupported("remove"))
    ));
    assert!(matches!(
        ctx.rename("/A", "/Z"),
        Err(Error::Unsupported("rename"))
    ));
    assert!(matches!(
        ctx.truncate("/A/B (2001)/01 - T.flac", 0),
        Err(Error::Unsupported("truncate"))
    ));
}
