// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! CLI output reporter with colored formatting

use colored::*;
use metaform::{GeometryStats, MarchStatus, SurfaceSearch};
use nalgebra::Point3;
use std::time::Duration;

/// CLI reporter for formatted output
pub struct Reporter;

impl Reporter {
    /// Report a finished triangulation
    pub fn report_mesh(
        scene: &str,
        output: &str,
        status: MarchStatus,
        stats: &GeometryStats,
        duration: Duration,
        verbose: bool,
    ) {
        println!("\n{}", "━".repeat(80).bright_black());
        println!("{} {} -> {}", "Meshed:".bold(), scene.cyan(), output.cyan());
        println!("{}", "━".repeat(80).bright_black());

        match status {
            MarchStatus::Complete => println!("  {} {}", "Status:".bright_black(), "complete".green()),
            MarchStatus::Truncated => println!(
                "  {} {}",
                "Status:".bright_black(),
                "truncated by cube cap or bounds".yellow()
            ),
            MarchStatus::Empty(reason) => println!(
                "  {} {}",
                "Status:".bright_black(),
                format!("empty ({reason:?})").red()
            ),
        }
        Self::print_value("Vertices", stats.vertex_count.to_string());
        Self::print_value("Triangles", stats.triangle_count.to_string());
        if verbose {
            Self::print_value("Volume", format!("{:.6}", stats.volume));
            Self::print_value("Surface area", format!("{:.6}", stats.surface_area));
            let [x0, y0, z0, x1, y1, z1] = stats.bbox;
            Self::print_value(
                "Bounds",
                format!("[{x0:.3}, {y0:.3}, {z0:.3}] .. [{x1:.3}, {y1:.3}, {z1:.3}]"),
            );
            let watertight = if stats.is_watertight {
                "yes".green()
            } else {
                "no".red()
            };
            println!("  {} {}", "Watertight:".bright_black(), watertight);
        }
        println!(
            "  {} {}",
            "Time:".bright_black(),
            Self::format_duration(duration).yellow()
        );
        println!("{}", "━".repeat(80).bright_black());
    }

    /// Report a ray probe
    pub fn report_probe(hit: Option<Point3<f64>>, residual: Option<f64>) {
        match (hit, residual) {
            (Some(p), Some(r)) => println!(
                "{} {} {}",
                "Hit:".bold(),
                Self::format_point(&p).cyan(),
                format!("(residual {r:e})").bright_black()
            ),
            _ => println!("{} {}", "Hit:".bold(), "none".yellow()),
        }
    }

    /// Report a closest-point search
    pub fn report_closest(label: &str, search: &SurfaceSearch) {
        match search {
            SurfaceSearch::Found {
                point,
                distance,
                iterations,
            } => println!(
                "{} {} {}",
                format!("{label}:").bold(),
                Self::format_point(point).cyan(),
                format!("(distance {distance:.6}, {iterations} iterations)").bright_black()
            ),
            SurfaceSearch::NoConvergence {
                residual,
                iterations,
                ..
            } => println!(
                "{} {} {}",
                format!("{label}:").bold(),
                "no surface found nearby".yellow(),
                format!("(residual {residual:e}, {iterations} iterations)").bright_black()
            ),
        }
    }

    /// Report connected components
    pub fn report_islands(islands: &[Vec<usize>], verbose: bool) {
        let color = if islands.len() <= 1 {
            islands.len().to_string().green()
        } else {
            islands.len().to_string().yellow()
        };
        println!("{} {}", "Islands:".bold(), color);
        for (i, island) in islands.iter().enumerate() {
            if verbose {
                println!("  {} {:?}", format!("#{i}:").bright_black(), island);
            } else {
                println!(
                    "  {} {} primitives",
                    format!("#{i}:").bright_black(),
                    island.len()
                );
            }
        }
    }

    /// Report error
    pub fn report_error(message: &str) {
        eprintln!("\n{} {}", "❌ Error:".red().bold(), message);
    }

    /// Report warning
    pub fn report_warning(message: &str) {
        println!("\n{} {}", "⚠️  Warning:".yellow().bold(), message);
    }

    /// Report info
    pub fn report_info(message: &str) {
        println!("{} {}", "ℹ️".bright_blue(), message);
    }

    /// Print success message
    pub fn success(message: &str) {
        println!("{} {}", "✅".green(), message.green());
    }

    fn print_value(name: &str, value: String) {
        println!("  {} {}", format!("{name}:").bright_black(), value.cyan());
    }

    fn format_point(p: &Point3<f64>) -> String {
        format!("({:.6}, {:.6}, {:.6})", p.x, p.y, p.z)
    }

    /// Format duration for display
    fn format_duration(duration: Duration) -> String {
        let micros = duration.as_micros();

        if micros < 1_000 {
            format!("{}µs", micros)
        } else if micros < 1_000_000 {
            format!("{:.2}ms", micros as f64 / 1_000.0)
        } else {
            format!("{:.2}s", micros as f64 / 1_000_000.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(
            Reporter::format_duration(Duration::from_micros(500)),
            "500µs"
        );
        assert_eq!(
            Reporter::format_duration(Duration::from_millis(5)),
            "5.00ms"
        );
        assert_eq!(Reporter::format_duration(Duration::from_secs(2)), "2.00s");
    }

    #[test]
    fn test_format_point() {
        let p = Point3::new(1.0, -0.5, 0.25);
        assert_eq!(
            Reporter::format_point(&p),
            "(1.000000, -0.500000, 0.250000)"
        );
    }
}
