// SPDX-License-Identifier: GPL-3.0-or-later
pub mod collections;
pub mod commands;
pub mod events;
pub mod exclusions;
pub mod index;
pub mod movies;
pub mod providers;
pub mod rename;
pub mod studios;
pub mod system;
pub mod tags;
