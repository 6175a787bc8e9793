// SPDX-FileCopyrightText: 2023 Marshall Wace <opensource@mwam.com>
// SPDX-License-Identifier: Apache-2.0
// SPDX-FileContributor: Tim Kendrick <t.kendrick@mwam.com> https://github.com/timkendrickmw
mod parser;
pub use parser::{parse, parse_file, ParserError, ParserResult};

pub mod prelude;
pub use prelude::{with_prelude, Instrument, PRELUDE};
