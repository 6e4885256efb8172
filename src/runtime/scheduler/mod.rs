// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

mod flushable;
mod trampoline;

//==============================================================================
// Exports
//==============================================================================

pub use self::{
    flushable::{
        FlushId,
        Flushable,
    },
    trampoline::Trampoline,
};
