//! Frame-based animations.
//!
//! An [`Animation`] cycles through texture paths, holding each frame for
//! `frame_time` ticks. The renderer is an external collaborator, so the
//! engine only tracks which path is current. [`AnimationSnapshot`] is the
//! plain record the save codec reads and writes.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Texture shown when a real animation is unavailable.
pub const MISSING_TEXTURE: &str = "animation/missingTexture.png";

/// Frame time used by [`Animation::missing_texture`].
pub const DEFAULT_FRAME_TIME: u32 = 100;

#[derive(Debug, thiserror::Error)]
pub enum AnimationError {
    #[error("animation has no frames")]
    NoFrames,

    #[error("animation frame time must be positive")]
    ZeroFrameTime,

    #[error("frame index {index} out of range for {frames} frames")]
    FrameIndexOutOfRange { index: usize, frames: usize },

    #[error("frame time counter {counter} must be below frame time {frame_time}")]
    CounterOutOfRange { counter: u32, frame_time: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Animation {
    frames: Vec<String>,
    frame_time: u32,
    current_frame_index: usize,
    frame_time_counter: u32,
}

impl Animation {
    pub fn new(frames: Vec<String>, frame_time: u32) -> Result<Self, AnimationError> {
        if frames.is_empty() {
            return Err(AnimationError::NoFrames);
        }
        if frame_time == 0 {
            return Err(AnimationError::ZeroFrameTime);
        }
        Ok(Self {
            frames,
            frame_time,
            current_frame_index: 0,
            frame_time_counter: 0,
        })
    }

    /// A single-frame placeholder animation.
    pub fn missing_texture() -> Self {
        Self {
            frames: vec![MISSING_TEXTURE.to_owned()],
            frame_time: DEFAULT_FRAME_TIME,
            current_frame_index: 0,
            frame_time_counter: 0,
        }
    }

    /// Return the current frame path and advance one tick.
    ///
    /// The counter wraps at `frame_time`; each wrap moves to the next frame,
    /// looping back to the first after the last.
    pub fn next_frame_path(&mut self) -> &str {
        let index = self.current_frame_index;
        self.frame_time_counter = (self.frame_time_counter + 1) % self.frame_time;
        if self.frame_time_counter == 0 {
            self.current_frame_index = (self.current_frame_index + 1) % self.frames.len();
        }
        &self.frames[index]
    }

    pub fn current_frame_path(&self) -> &str {
        &self.frames[self.current_frame_index]
    }

    pub fn frames(&self) -> &[String] {
        &self.frames
    }

    pub fn frame_time(&self) -> u32 {
        self.frame_time
    }

    pub fn current_frame_index(&self) -> usize {
        self.current_frame_index
    }

    pub fn frame_time_counter(&self) -> u32 {
        self.frame_time_counter
    }

    /// Capture playback state. Frames under `resource_root` are stored
    /// relative to it; other paths are kept as they are.
    pub fn snapshot(&self, resource_root: &Path) -> AnimationSnapshot {
        let frames = self
            .frames
            .iter()
            .map(|frame| {
                Path::new(frame)
                    .strip_prefix(resource_root)
                    .ok()
                    .filter(|_| !resource_root.as_os_str().is_empty())
                    .map_or_else(|| frame.clone(), |rel| rel.to_string_lossy().into_owned())
            })
            .collect();
        AnimationSnapshot {
            frames,
            duration: self.frame_time,
            current_frame_index: self.current_frame_index,
            frame_time_counter: self.frame_time_counter,
        }
    }

    /// Rebuild an animation mid-playback.
    pub fn from_snapshot(snapshot: AnimationSnapshot) -> Result<Self, AnimationError> {
        let mut animation = Self::new(snapshot.frames, snapshot.duration)?;
        if snapshot.current_frame_index >= animation.frames.len() {
            return Err(AnimationError::FrameIndexOutOfRange {
                index: snapshot.current_frame_index,
                frames: animation.frames.len(),
            });
        }
        if snapshot.frame_time_counter >= animation.frame_time {
            return Err(AnimationError::CounterOutOfRange {
                counter: snapshot.frame_time_counter,
                frame_time: animation.frame_time,
            });
        }
        animation.current_frame_index = snapshot.current_frame_index;
        animation.frame_time_counter = snapshot.frame_time_counter;
        Ok(animation)
    }
}

impl Default for Animation {
    fn default() -> Self {
        Self::missing_texture()
    }
}

/// Everything needed to resume an [`Animation`] exactly where it stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimationSnapshot {
    pub frames: Vec<String>,
    /// Ticks each frame is held for.
    pub duration: u32,
    pub current_frame_index: usize,
    pub frame_time_counter: u32,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
