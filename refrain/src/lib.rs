// SPDX-FileCopyrightText: 2023 Marshall Wace <opensource@mwam.com>
// SPDX-License-Identifier: Apache-2.0
// SPDX-FileContributor: Tim Kendrick <t.kendrick@mwam.com> https://github.com/timkendrickmw
pub mod builtin;
pub mod lang;
pub mod runtime;
pub mod specializer;

pub use specializer::{
    specialize, specialize_closure, Evaluate, SpecializeError, Specialization, SpecializerOptions,
};
