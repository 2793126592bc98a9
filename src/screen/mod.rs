// src/screen/mod.rs

//! The normal/alternate screen buffer pair.
//!
//! A [`BufferSet`] owns exactly two [`ScreenBuffer`]s and names one of them as
//! active. Switching screens carries the cursor position across, so the cursor
//! stays where it was on screen while the content underneath changes. Line
//! storage is opaque here: the set only creates, resizes and holds it.

use crate::config::ScreenConfig;
use log::{debug, trace};
use std::cmp::min;

/// Line storage a screen buffer holds on behalf of the grid implementation.
pub trait LineStorage {
    /// Create storage for a `cols x rows` viewport plus `scrollback` history lines.
    fn new(cols: usize, rows: usize, scrollback: usize) -> Self
    where
        Self: Sized;

    /// Change the viewport size.
    fn resize(&mut self, cols: usize, rows: usize);
}

/// Minimal character grid, enough to hold screen content for the buffer set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lines {
    rows: Vec<Vec<char>>,
    cols: usize,
    scrollback: usize,
}

impl Lines {
    pub fn get(&self, x: usize, y: usize) -> Option<char> {
        self.rows.get(y)?.get(x).copied()
    }

    pub fn set(&mut self, x: usize, y: usize, c: char) {
        if let Some(cell) = self.rows.get_mut(y).and_then(|row| row.get_mut(x)) {
            *cell = c;
        }
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows.len()
    }

    pub fn scrollback(&self) -> usize {
        self.scrollback
    }
}

impl LineStorage for Lines {
    fn new(cols: usize, rows: usize, scrollback: usize) -> Self {
        Self {
            rows: vec![vec![' '; cols]; rows],
            cols,
            scrollback,
        }
    }

    fn resize(&mut self, cols: usize, rows: usize) {
        self.rows.resize_with(rows, || vec![' '; cols]);
        for row in self.rows.iter_mut() {
            row.resize(cols, ' ');
        }
        self.cols = cols;
    }
}

/// Which of the two screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScreenKind {
    Normal,
    Alt,
}

/// One screen's mutable display state.
#[derive(Debug, Clone)]
pub struct ScreenBuffer<L = Lines> {
    /// Cursor column, 0-based.
    pub x: usize,
    /// Cursor row, 0-based, relative to the viewport.
    pub y: usize,
    scrollback: usize,
    lines: L,
}

impl<L: LineStorage> ScreenBuffer<L> {
    pub fn new(cols: usize, rows: usize, scrollback: usize) -> Self {
        Self {
            x: 0,
            y: 0,
            scrollback,
            lines: L::new(cols, rows, scrollback),
        }
    }

    /// History lines kept above the viewport. Always 0 for the alternate screen.
    pub fn scrollback(&self) -> usize {
        self.scrollback
    }

    pub fn has_scrollback(&self) -> bool {
        self.scrollback > 0
    }

    pub fn lines(&self) -> &L {
        &self.lines
    }

    pub fn lines_mut(&mut self) -> &mut L {
        &mut self.lines
    }

    fn resize(&mut self, cols: usize, rows: usize) {
        self.lines.resize(cols, rows);
        self.x = min(self.x, cols.saturating_sub(1));
        self.y = min(self.y, rows.saturating_sub(1));
    }
}

/// Owns the normal and alternate screens and tracks which one is active.
pub struct BufferSet<L = Lines> {
    normal: ScreenBuffer<L>,
    alt: ScreenBuffer<L>,
    active: ScreenKind,
    cols: usize,
    rows: usize,
}

impl<L: LineStorage> BufferSet<L> {
    /// Create both screens fresh. The normal screen starts active; no cursor
    /// copy happens at construction.
    pub fn new(cols: usize, rows: usize, scrollback: usize) -> Self {
        debug!(
            "BufferSet: Creating {}x{} screens, {} lines of scrollback",
            cols, rows, scrollback
        );
        Self {
            normal: ScreenBuffer::new(cols, rows, scrollback),
            alt: ScreenBuffer::new(cols, rows, 0),
            active: ScreenKind::Normal,
            cols,
            rows,
        }
    }

    pub fn from_config(config: &ScreenConfig) -> Self {
        Self::new(config.columns, config.rows, config.scrollback_lines)
    }

    /// Make `which` the active screen, carrying the cursor over from the
    /// previously active one. Screen contents are left alone.
    pub fn activate(&mut self, which: ScreenKind) {
        let (x, y) = {
            let prev = self.active();
            (prev.x, prev.y)
        };

        let target = self.buffer_mut(which);
        target.x = x;
        target.y = y;

        if self.active != which {
            trace!("BufferSet: {:?} -> {:?}, cursor at ({}, {})", self.active, which, x, y);
        }
        self.active = which;
    }

    pub fn activate_normal(&mut self) {
        self.activate(ScreenKind::Normal);
    }

    pub fn activate_alt(&mut self) {
        self.activate(ScreenKind::Alt);
    }

    pub fn active_kind(&self) -> ScreenKind {
        self.active
    }

    pub fn is_alt_active(&self) -> bool {
        self.active == ScreenKind::Alt
    }

    pub fn active(&self) -> &ScreenBuffer<L> {
        self.buffer(self.active)
    }

    pub fn active_mut(&mut self) -> &mut ScreenBuffer<L> {
        self.buffer_mut(self.active)
    }

    pub fn normal(&self) -> &ScreenBuffer<L> {
        &self.normal
    }

    pub fn normal_mut(&mut self) -> &mut ScreenBuffer<L> {
        &mut self.normal
    }

    pub fn alt(&self) -> &ScreenBuffer<L> {
        &self.alt
    }

    pub fn alt_mut(&mut self) -> &mut ScreenBuffer<L> {
        &mut self.alt
    }

    pub fn buffer(&self, which: ScreenKind) -> &ScreenBuffer<L> {
        match which {
            ScreenKind::Normal => &self.normal,
            ScreenKind::Alt => &self.alt,
        }
    }

    pub fn buffer_mut(&mut self, which: ScreenKind) -> &mut ScreenBuffer<L> {
        match which {
            ScreenKind::Normal => &mut self.normal,
            ScreenKind::Alt => &mut self.alt,
        }
    }

    /// Viewport size as `(cols, rows)`.
    pub fn size(&self) -> (usize, usize) {
        (self.cols, self.rows)
    }

    /// Resize both screens and clamp both cursors into the new viewport.
    pub fn resize(&mut self, cols: usize, rows: usize) {
        debug!(
            "BufferSet: Resize {}x{} -> {}x{}",
            self.cols, self.rows, cols, rows
        );
        self.normal.resize(cols, rows);
        self.alt.resize(cols, rows);
        self.cols = cols;
        self.rows = rows;
    }
}
