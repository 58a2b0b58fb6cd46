use bitflags::bitflags;
use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use thiserror::Error;

use crate::data::{ClipShape, Color};
use crate::element::VisualState;

bitflags! {
    /// Which element fields a theme record may touch. Used to reset only
    /// what theming actually changed.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct ThemeFieldMask: u8 {
        const BACKGROUND = 1 << 0;
        const CLIP = 1 << 1;
        const VISIBLE = 1 << 2;
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ThemeError {
    #[error("theme record targets kind {expected:?} but was applied to {found:?}")]
    TypeMismatch { expected: SmolStr, found: SmolStr },
}

/// A partial visual record. Only present fields override the element;
/// absent ones leave it alone. An optional `kind` tag restricts which
/// element kind the record may be applied to.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ThemeData {
    pub kind: Option<SmolStr>,
    pub background: Option<Color>,
    pub clip: Option<ClipShape>,
    pub visible: Option<bool>,
}

impl ThemeData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_kind(mut self, kind: impl Into<SmolStr>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn with_background(mut self, color: Color) -> Self {
        self.background = Some(color);
        self
    }

    pub fn with_clip(mut self, clip: ClipShape) -> Self {
        self.clip = Some(clip);
        self
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = Some(visible);
        self
    }

    /// Fields present here win; fields absent here fall through to `base`.
    pub fn merged_over(&self, base: &Self) -> Self {
        Self {
            kind: self.kind.clone().or_else(|| base.kind.clone()),
            background: self.background.or(base.background),
            clip: self.clip.clone().or_else(|| base.clip.clone()),
            visible: self.visible.or(base.visible),
        }
    }

    pub fn mask(&self) -> ThemeFieldMask {
        let mut mask = ThemeFieldMask::empty();
        if self.background.is_some() {
            mask.insert(ThemeFieldMask::BACKGROUND);
        }
        if self.clip.is_some() {
            mask.insert(ThemeFieldMask::CLIP);
        }
        if self.visible.is_some() {
            mask.insert(ThemeFieldMask::VISIBLE);
        }
        mask
    }
}

/// Theme context: records keyed by element kind name and visual state.
/// Documents hold their own instance; [`Theme::standard`] seeds from the
/// process-wide default.
#[derive(Clone, Debug, Default)]
pub struct Theme {
    records: FxHashMap<(SmolStr, VisualState), ThemeData>,
}

static DEFAULT_THEME: Lazy<Theme> = Lazy::new(Theme::default);

impl Theme {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of the process default. Hosts install their palette on top.
    pub fn standard() -> Self {
        DEFAULT_THEME.clone()
    }

    pub fn insert(
        &mut self,
        kind: impl Into<SmolStr>,
        state: VisualState,
        data: ThemeData,
    ) -> Option<ThemeData> {
        self.records.insert((kind.into(), state), data)
    }

    pub fn remove(&mut self, kind: &str, state: VisualState) -> Option<ThemeData> {
        self.records.remove(&(SmolStr::new(kind), state))
    }

    /// The record for `(kind, state)`, with the `Normal` record as the base
    /// layer when a more specific one exists.
    pub fn resolve(&self, kind: &str, state: VisualState) -> Option<ThemeData> {
        let kind = SmolStr::new(kind);
        let base = self.records.get(&(kind.clone(), VisualState::Normal));
        if state == VisualState::Normal {
            return base.cloned();
        }
        match (self.records.get(&(kind, state)), base) {
            (Some(specific), Some(base)) => Some(specific.merged_over(base)),
            (Some(specific), None) => Some(specific.clone()),
            (None, base) => base.cloned(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
