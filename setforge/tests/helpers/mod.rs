//! Test Helper Utilities
//!
//! Shared utilities for testing setforge

#![allow(dead_code)]

pub mod audio_generator;
pub mod engines;
pub mod harness;

pub use audio_generator::{generate_test_wav, wav_bytes, AudioConfig};
pub use engines::{features, FailingStore, Scripted, ScriptedEngine};
pub use harness::{multipart_body, read_json, TestApp};
