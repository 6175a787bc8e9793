// SPDX-FileCopyrightText: 2023 Marshall Wace <opensource@mwam.com>
// SPDX-License-Identifier: Apache-2.0
// SPDX-FileContributor: Tim Kendrick <t.kendrick@mwam.com> https://github.com/timkendrickmw
use strum::IntoEnumIterator;
use strum_macros::EnumIter;

/// Sound-synthesis library available to every program run with the prelude
pub const PRELUDE: &str = include_str!("prelude/sound.js");

/// Prepends the prelude library to a program
pub fn with_prelude(source: &str) -> String {
    format!("{}\n{}", PRELUDE, source)
}

/// Instrument constructors defined by the prelude, each taking a MIDI note and a duration
#[derive(Eq, PartialEq, Clone, Copy, Debug, EnumIter)]
pub enum Instrument {
    Trombone,
    Piano,
    Bell,
    Violin,
    Cello,
}
impl Instrument {
    pub fn entries() -> impl Iterator<Item = Self> {
        Self::iter()
    }
    pub fn name(&self) -> &'static str {
        match self {
            Self::Trombone => "trombone",
            Self::Piano => "piano",
            Self::Bell => "bell",
            Self::Violin => "violin",
            Self::Cello => "cello",
        }
    }
    /// Source expression that plays the given note for the given number of seconds
    pub fn play(&self, note: u8, duration: f64) -> String {
        format!("{}({}, {})", self.name(), note, duration)
    }
}
impl std::fmt::Display for Instrument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
