use crate::err::{Result, RewriteError};
use crate::marker::missing_cue_events;
use crate::track_cues::TrackCues;

use log::{debug, info, trace, warn};
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

const PLAYLISTS_ROOT_TAG: &[u8] = b"DJ_PLAYLISTS";
const COLLECTION_TAG: &[u8] = b"COLLECTION";
const TRACK_TAG: &[u8] = b"TRACK";
const POSITION_MARK_TAG: &[u8] = b"POSITION_MARK";

/// Innermost recognized container the rewriter is currently inside.
///
/// Anything outside these four levels leaves the context unchanged, which
/// degrades the rewriter to pure passthrough for unrecognized content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseContext {
    Root,
    PlaylistsRoot,
    Collection,
    Track,
}

/// Per-track state, alive between `<TRACK>` and the matching `</TRACK>`.
struct TrackScope {
    name: String,
    cues: TrackCues,
}

impl TrackScope {
    fn open(track: &BytesStart<'_>) -> Result<Self> {
        let mut name = String::new();
        for attr in track.attributes() {
            let attr = attr?;
            if attr.key.local_name().as_ref() == b"Name" {
                name = attr.unescape_value()?.into_owned();
            }
        }
        debug!("entering track {name:?}");

        Ok(TrackScope {
            name,
            cues: TrackCues::default(),
        })
    }
}

/// Counters for one full pass over a document.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RewriteSummary {
    /// Tracks that received at least one synthesized cue.
    pub tracks_changed: usize,
    /// Total synthesized cues across all tracks.
    pub cues_added: usize,
}

/// Single-pass, bounded-memory rewriter over a rekordbox collection document.
///
/// Pulls one token at a time from the reader and forwards every token to the
/// writer unchanged. The only exception is a `</TRACK>` inside the
/// collection: that one token is withheld until the memory cues missing from
/// the track have been emitted in front of it. Memory use is bounded by one
/// track's cue index; the document is never materialized.
pub struct CueRewriter<R: BufRead, W: Write> {
    reader: Reader<R>,
    writer: Writer<W>,
    context: ParseContext,
    track: Option<TrackScope>,
    summary: RewriteSummary,
}

impl CueRewriter<BufReader<File>, BufWriter<File>> {
    pub fn from_paths(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Result<Self> {
        let input = input.as_ref();
        let fin = File::open(input).map_err(|source| RewriteError::FailedToOpenInput {
            path: input.to_path_buf(),
            source,
        })?;

        let output = output.as_ref();
        let fout = File::create(output).map_err(|source| RewriteError::FailedToCreateOutput {
            path: output.to_path_buf(),
            source,
        })?;

        Ok(CueRewriter::new(BufReader::new(fin), BufWriter::new(fout)))
    }
}

impl<R: BufRead, W: Write> CueRewriter<R, W> {
    /// The reader keeps its default configuration (no text trimming, no
    /// empty-element expansion) so that untouched nodes round-trip
    /// byte-for-byte.
    pub fn new(input: R, output: W) -> Self {
        CueRewriter {
            reader: Reader::from_reader(input),
            writer: Writer::new(output),
            context: ParseContext::Root,
            track: None,
            summary: RewriteSummary::default(),
        }
    }

    /// Drives the token loop until end of stream, then flushes the output.
    /// Returns the counters together with the inner writer.
    pub fn run(mut self) -> Result<(RewriteSummary, W)> {
        let mut buf = Vec::new();

        loop {
            buf.clear();
            match self.reader.read_event_into(&mut buf)? {
                Event::Eof => break,
                Event::Start(start) => self.on_start(start)?,
                Event::Empty(empty) => self.on_empty(empty)?,
                Event::End(end) => self.on_end(end)?,
                other => self.forward(other)?,
            }
        }

        let mut output = self.writer.into_inner();
        output.flush().map_err(RewriteError::Flush)?;

        Ok((self.summary, output))
    }

    fn forward(&mut self, event: Event<'_>) -> Result<()> {
        self.writer
            .write_event(event)
            .map_err(|e| RewriteError::XmlOutput {
                message: e.to_string(),
            })
    }

    fn on_start(&mut self, start: BytesStart<'_>) -> Result<()> {
        match self.context {
            ParseContext::Root => {
                if start.local_name().as_ref() == PLAYLISTS_ROOT_TAG {
                    trace!("entering DJ_PLAYLISTS");
                    self.context = ParseContext::PlaylistsRoot;
                }
            }
            ParseContext::PlaylistsRoot => {
                if start.local_name().as_ref() == COLLECTION_TAG {
                    info!("found collection");
                    self.context = ParseContext::Collection;
                }
            }
            ParseContext::Collection => {
                if start.local_name().as_ref() == TRACK_TAG {
                    self.track = Some(TrackScope::open(&start)?);
                    self.context = ParseContext::Track;
                }
            }
            ParseContext::Track => {
                if start.local_name().as_ref() == POSITION_MARK_TAG {
                    self.observe_marker(&start)?;
                }
            }
        }

        self.forward(Event::Start(start))
    }

    /// Self-closing elements classify like start tokens, but nothing can nest
    /// inside them, so no scope is opened.
    fn on_empty(&mut self, empty: BytesStart<'_>) -> Result<()> {
        if self.context == ParseContext::Track && empty.local_name().as_ref() == POSITION_MARK_TAG
        {
            self.observe_marker(&empty)?;
        }

        self.forward(Event::Empty(empty))
    }

    fn on_end(&mut self, end: BytesEnd<'_>) -> Result<()> {
        match self.context {
            ParseContext::PlaylistsRoot if end.local_name().as_ref() == PLAYLISTS_ROOT_TAG => {
                self.context = ParseContext::Root;
            }
            ParseContext::Collection if end.local_name().as_ref() == COLLECTION_TAG => {
                self.context = ParseContext::PlaylistsRoot;
            }
            ParseContext::Track if end.local_name().as_ref() == TRACK_TAG => {
                // The closing tag is withheld until the synthesized cues are
                // out, then forwarded below.
                self.close_track()?;
                self.context = ParseContext::Collection;
            }
            _ => {}
        }

        self.forward(Event::End(end))
    }

    /// Classifies one `POSITION_MARK` into the active track's cue index.
    /// A marker whose `Start` or `Num` is absent or empty is not classified;
    /// it is forwarded unchanged and only reported.
    fn observe_marker(&mut self, marker: &BytesStart<'_>) -> Result<()> {
        let mut start = None;
        let mut num = None;
        for attr in marker.attributes() {
            let attr = attr?;
            match attr.key.local_name().as_ref() {
                b"Start" => start = Some(attr.unescape_value()?.into_owned()),
                b"Num" => num = Some(attr.unescape_value()?.into_owned()),
                _ => {}
            }
        }

        let track = match self.track.as_mut() {
            Some(track) => track,
            None => return Ok(()),
        };

        match (start, num) {
            (Some(start), Some(num)) if !start.is_empty() && !num.is_empty() => {
                trace!("marker at {start} with Num={num}");
                track.cues.observe(start, &num);
            }
            _ => warn!(
                "{:?}: position mark without Start or Num, leaving as-is",
                track.name
            ),
        }

        Ok(())
    }

    /// Emits one `POSITION_MARK` pair for every position that has a hot cue
    /// but no memory cue, ascending by position text, then drops the scope.
    fn close_track(&mut self) -> Result<()> {
        let scope = match self.track.take() {
            Some(scope) => scope,
            None => return Ok(()),
        };

        let mut track_changed = false;
        for start in scope.cues.positions_missing_cue() {
            let (open, close) = missing_cue_events(start);
            self.writer
                .write_event(Event::Start(open))
                .and_then(|_| self.writer.write_event(Event::End(close)))
                .map_err(|e| RewriteError::XmlOutput {
                    message: e.to_string(),
                })?;

            info!("{}: adding cue at {}", scope.name, start);

            if !track_changed {
                track_changed = true;
                self.summary.tracks_changed += 1;
            }
            self.summary.cues_added += 1;
        }

        Ok(())
    }
}
