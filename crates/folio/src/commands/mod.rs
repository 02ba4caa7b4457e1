//! CLI command implementations.

pub(crate) mod build;
pub(crate) mod codec;
pub(crate) mod patch_tex;

pub(crate) use build::BuildArgs;
pub(crate) use codec::{DecodeArgs, EncodeArgs};
pub(crate) use patch_tex::PatchTexArgs;
