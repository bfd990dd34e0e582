/*
 * This file is part of gpadc.
 *
 * Copyright (C) 2025 gpadc contributors
 *
 * gpadc is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * gpadc is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with gpadc. If not, see <https://www.gnu.org/licenses/>.
 */

use clap::Parser;

use gpadc::cli::Cli;
use gpadc::commands;

fn main() {
    let cli = Cli::parse();

    let log_level = std::env::var("GPADC_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_env_filter(&log_level)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = commands::run(&cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(commands::exit_code(&e));
    }
}
