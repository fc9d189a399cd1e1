//! Line-oriented event scripts for driving a viewer headlessly
//!
//! One command per line, `#` starts a comment:
//!
//! ```text
//! next | prev | goto N
//! zoom +0.25 | zoom in | zoom out | scale 2.0
//! origin X Y              # on-screen position of the tag layer
//! drag X1 Y1 X2 Y2        # pointer down at (X1,Y1), up at (X2,Y2)
//! click X Y
//! select I
//! cancel | wait | tags | all
//! snapshot PATH
//! ```

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use log::{debug, info, warn};

use crate::pdf::{RasterBackend, RenderEvent};
use crate::tags::Point;
use crate::viewer::Viewer;

#[derive(Clone, Debug, PartialEq)]
pub enum ZoomStep {
    In,
    Out,
    By(f32),
}

#[derive(Clone, Debug, PartialEq)]
pub enum ScriptCommand {
    Next,
    Prev,
    GoTo(usize),
    Zoom(ZoomStep),
    Scale(f32),
    Origin(Point),
    Drag { from: Point, to: Point },
    Click(Point),
    Select(usize),
    Cancel,
    Wait,
    /// Print the current page's tags
    Tags,
    /// Print every tag in the store
    All,
    Snapshot(PathBuf),
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ScriptError {
    #[error("unknown command `{0}`")]
    Unknown(String),

    #[error("`{command}` expects {expected}")]
    Arguments {
        command: &'static str,
        expected: &'static str,
    },

    #[error("line {line}: {source}")]
    Line {
        line: usize,
        #[source]
        source: Box<ScriptError>,
    },
}

fn args<T: FromStr, const N: usize>(
    parts: &[&str],
    command: &'static str,
    expected: &'static str,
) -> Result<[T; N], ScriptError> {
    let err = || ScriptError::Arguments { command, expected };
    if parts.len() != N {
        return Err(err());
    }
    let parsed = parts
        .iter()
        .map(|p| p.parse::<T>().map_err(|_| err()))
        .collect::<Result<Vec<T>, ScriptError>>()?;
    parsed.try_into().map_err(|_| err())
}

impl FromStr for ScriptCommand {
    type Err = ScriptError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            return Err(ScriptError::Unknown(String::new()));
        };
        let rest: Vec<&str> = words.collect();

        let cmd = match command.to_ascii_lowercase().as_str() {
            "next" => Self::Next,
            "prev" => Self::Prev,
            "goto" => {
                let [page]: [usize; 1] = args(&rest, "goto", "a page number")?;
                Self::GoTo(page)
            }
            "zoom" => match rest.as_slice() {
                ["in"] => Self::Zoom(ZoomStep::In),
                ["out"] => Self::Zoom(ZoomStep::Out),
                _ => {
                    let [delta]: [f32; 1] =
                        args(&rest, "zoom", "`in`, `out`, or a signed delta")?;
                    Self::Zoom(ZoomStep::By(delta))
                }
            },
            "scale" => {
                let [scale]: [f32; 1] = args(&rest, "scale", "a zoom factor")?;
                Self::Scale(scale)
            }
            "origin" => {
                let [x, y]: [f32; 2] = args(&rest, "origin", "X Y")?;
                Self::Origin(Point::new(x, y))
            }
            "drag" => {
                let [x1, y1, x2, y2]: [f32; 4] = args(&rest, "drag", "X1 Y1 X2 Y2")?;
                Self::Drag {
                    from: Point::new(x1, y1),
                    to: Point::new(x2, y2),
                }
            }
            "click" => {
                let [x, y]: [f32; 2] = args(&rest, "click", "X Y")?;
                Self::Click(Point::new(x, y))
            }
            "select" => {
                let [index]: [usize; 1] = args(&rest, "select", "a tag index")?;
                Self::Select(index)
            }
            "cancel" => Self::Cancel,
            "wait" => Self::Wait,
            "tags" => Self::Tags,
            "all" => Self::All,
            "snapshot" => match rest.as_slice() {
                [path] => Self::Snapshot(PathBuf::from(*path)),
                _ => {
                    return Err(ScriptError::Arguments {
                        command: "snapshot",
                        expected: "a file path",
                    });
                }
            },
            other => return Err(ScriptError::Unknown(other.to_string())),
        };
        Ok(cmd)
    }
}

/// Parse a whole script, skipping blank lines and comments
pub fn parse_script(text: &str) -> Result<Vec<ScriptCommand>, ScriptError> {
    text.lines()
        .enumerate()
        .filter_map(|(i, line)| {
            let line = line.split('#').next().unwrap_or_default().trim();
            (!line.is_empty()).then_some((i + 1, line))
        })
        .map(|(line, text)| {
            text.parse().map_err(|e| ScriptError::Line {
                line,
                source: Box::new(e),
            })
        })
        .collect()
}

/// Executes script commands against a viewer and reports to `out`
pub struct ScriptRunner<'a, B: RasterBackend, W: Write> {
    viewer: &'a mut Viewer<B>,
    out: W,
    timeout: Duration,
    auto_wait: bool,
}

impl<'a, B: RasterBackend, W: Write> ScriptRunner<'a, B, W> {
    pub fn new(viewer: &'a mut Viewer<B>, out: W, timeout: Duration) -> Self {
        Self {
            viewer,
            out,
            timeout,
            auto_wait: true,
        }
    }

    /// With auto-wait off, renders settle only on `wait` (or when polled
    /// between commands), so later commands can supersede earlier renders.
    #[must_use]
    pub fn auto_wait(mut self, enabled: bool) -> Self {
        self.auto_wait = enabled;
        self
    }

    pub fn run_reader(&mut self, reader: impl BufRead) -> anyhow::Result<()> {
        for (i, line) in reader.lines().enumerate() {
            let line = line.context("Failed to read script")?;
            let text = line.split('#').next().unwrap_or_default().trim();
            if text.is_empty() {
                continue;
            }
            let cmd: ScriptCommand = text.parse().map_err(|e| ScriptError::Line {
                line: i + 1,
                source: Box::new(e),
            })?;
            self.execute(&cmd)?;
        }
        Ok(())
    }

    pub fn run(&mut self, commands: &[ScriptCommand]) -> anyhow::Result<()> {
        for cmd in commands {
            self.execute(cmd)?;
        }
        Ok(())
    }

    pub fn execute(&mut self, cmd: &ScriptCommand) -> anyhow::Result<()> {
        debug!("Script: {cmd:?}");
        self.viewer.pump();

        let issued = match cmd {
            ScriptCommand::Next => self.viewer.next_page(),
            ScriptCommand::Prev => self.viewer.prev_page(),
            ScriptCommand::GoTo(page) => self.viewer.go_to_page(*page),
            ScriptCommand::Zoom(ZoomStep::In) => self.viewer.zoom_in(),
            ScriptCommand::Zoom(ZoomStep::Out) => self.viewer.zoom_out(),
            ScriptCommand::Zoom(ZoomStep::By(delta)) => self.viewer.change_scale(*delta),
            ScriptCommand::Scale(scale) => self.viewer.set_scale(*scale),
            ScriptCommand::Origin(origin) => {
                self.viewer.set_layer_origin(*origin);
                None
            }
            ScriptCommand::Drag { from, to } => {
                self.viewer.pointer_down(*from);
                match self.viewer.pointer_up(*to) {
                    Some(tag) => {
                        info!("Script created {}", tag.label);
                        writeln!(self.out, "{}", serde_json::to_string(tag)?)?;
                    }
                    None => debug!("Drag {from:?} -> {to:?} created no tag"),
                }
                None
            }
            ScriptCommand::Click(point) => {
                self.viewer.pointer_down(*point);
                self.viewer.pointer_up(*point);
                None
            }
            ScriptCommand::Select(index) => {
                self.viewer.select(*index);
                None
            }
            ScriptCommand::Cancel => {
                self.viewer.cancel_render();
                None
            }
            ScriptCommand::Wait => {
                self.wait();
                None
            }
            ScriptCommand::Tags => {
                let tags: Vec<_> = self.viewer.tags_on_page().collect();
                writeln!(self.out, "{}", serde_json::to_string(&tags)?)?;
                None
            }
            ScriptCommand::All => {
                let tags: Vec<_> = self.viewer.tags().iter().collect();
                writeln!(self.out, "{}", serde_json::to_string(&tags)?)?;
                None
            }
            ScriptCommand::Snapshot(path) => {
                self.viewer
                    .snapshot(path)
                    .with_context(|| format!("Failed to write snapshot {}", path.display()))?;
                info!("Wrote snapshot {}", path.display());
                None
            }
        };

        if issued.is_some() && self.auto_wait {
            self.wait();
        }
        Ok(())
    }

    fn wait(&mut self) {
        match self.viewer.wait_for_render(self.timeout) {
            Some(RenderEvent::Failed { page, error }) => {
                warn!("Script: page {page} failed to render: {error}");
            }
            Some(RenderEvent::Completed { .. }) => {}
            None if self.viewer.is_rendering() => {
                warn!("Script: render still in flight after {:?}", self.timeout);
            }
            None => {}
        }
    }
}
