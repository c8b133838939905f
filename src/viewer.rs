use crate::plot::{Band, TIMELINE_TITLE, TimelinePlot};
use eframe::egui;
use egui_plot::{Legend, Line, Plot, PlotPoints, Polygon};

/// Interactive window showing the same timeline that was written to disk
pub struct TimelineViewer {
    plot: TimelinePlot,
}

impl TimelineViewer {
    pub fn new(plot: TimelinePlot) -> Self {
        Self { plot }
    }
}

/// Corners of a band as a closed polygon, counter-clockwise from the bottom-left
fn band_corners(band: &Band) -> Vec<[f64; 2]> {
    vec![[band.start, 0.0], [band.end, 0.0], [band.end, band.height], [band.start, band.height]]
}

fn series_points(series: &[(f64, f64)]) -> PlotPoints {
    series.iter().map(|&(x, y)| [x, y]).collect()
}

impl eframe::App for TimelineViewer {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading(TIMELINE_TITLE);
            ui.label(format!(
                "Start {} | {} records every {:.3}s | max crowd {}",
                self.plot.start_time.format("%d/%m/%Y %H:%M:%S"),
                self.plot.crowd.len(),
                self.plot.step_secs,
                self.plot.max_crowd
            ));
            ui.separator();

            let plot = &self.plot;
            Plot::new("crowd_timeline")
                .legend(Legend::default())
                .x_axis_label("Seconds from start")
                .y_axis_label("Count")
                .show(ui, |plot_ui| {
                    for band in &plot.restricted_bands {
                        plot_ui.polygon(Polygon::new(PlotPoints::new(band_corners(band))).fill_color(egui::Color32::from_rgba_unmultiplied(255, 0, 0, 160)).name("Restricted Entry Detected"));
                    }
                    for band in &plot.abnormal_bands {
                        plot_ui.polygon(Polygon::new(PlotPoints::new(band_corners(band))).fill_color(egui::Color32::from_rgba_unmultiplied(0, 0, 255, 160)).name("Abnormal Crowd Activity Detected"));
                    }

                    plot_ui.line(Line::new(series_points(&plot.crowd)).color(egui::Color32::from_rgb(255, 127, 14)).width(3.0).name("Crowd Count"));
                    plot_ui.line(Line::new(series_points(&plot.violations)).color(egui::Color32::from_rgb(31, 119, 180)).width(3.0).name("Violation Count"));
                });
        });
    }
}

pub fn show_timeline(plot: TimelinePlot) -> Result<(), eframe::Error> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1200.0, 800.0]).with_title("Crowd Timeline"),
        ..Default::default()
    };

    eframe::run_native("Crowd Timeline", options, Box::new(move |_cc| Box::new(TimelineViewer::new(plot))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_corners() {
        let band = Band { start: 1.5, end: 3.0, height: 0.8 };
        assert_eq!(band_corners(&band), vec![[1.5, 0.0], [3.0, 0.0], [3.0, 0.8], [1.5, 0.8]]);
    }

    #[test]
    fn test_series_points() {
        let points = series_points(&[(1.0, 5.0), (2.0, 8.0)]);
        assert_eq!(points.points().len(), 2);
        assert_eq!(points.points()[1].y, 8.0);
    }
}
