// SPDX-FileCopyrightText: 2023 Marshall Wace <opensource@mwam.com>
// SPDX-License-Identifier: Apache-2.0
// SPDX-FileContributor: Tim Kendrick <t.kendrick@mwam.com> https://github.com/timkendrickmw
pub use expression::*;
pub use literal::*;
pub use operator::*;
pub use printer::format_number;
pub use statement::*;

mod expression;
mod literal;
mod operator;
mod printer;
mod statement;
