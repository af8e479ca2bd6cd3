//! Plot data that accompanies a trajectory.
//!
//! Plots are stored in the container as viewer-ready JSON. These builders
//! validate trace shapes at construction and emit that JSON, so a plot value
//! that exists is always writable.

use serde_json::{json, Value};

use crate::util::{Error, Result};

/// How scatter points are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMode {
    #[default]
    Markers,
    Lines,
}

impl RenderMode {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Markers => "markers",
            Self::Lines => "lines",
        }
    }
}

/// An XY scatter plot with one shared X trace and named Y traces.
#[derive(Debug, Clone, PartialEq)]
pub struct ScatterPlotData {
    title: String,
    xaxis_title: String,
    yaxis_title: String,
    xtrace: Vec<f64>,
    ytraces: Vec<(String, Vec<f64>)>,
    render_mode: RenderMode,
}

impl ScatterPlotData {
    /// Create a scatter plot. Every Y trace must have the same length as the
    /// X trace.
    pub fn new(
        title: impl Into<String>,
        xaxis_title: impl Into<String>,
        yaxis_title: impl Into<String>,
        xtrace: Vec<f64>,
        ytraces: Vec<(String, Vec<f64>)>,
        render_mode: RenderMode,
    ) -> Result<Self> {
        for (name, ytrace) in &ytraces {
            if ytrace.len() != xtrace.len() {
                return Err(Error::validation(format!(
                    "Y trace '{}' has {} values but the X trace has {}",
                    name,
                    ytrace.len(),
                    xtrace.len()
                )));
            }
        }
        Ok(Self {
            title: title.into(),
            xaxis_title: xaxis_title.into(),
            yaxis_title: yaxis_title.into(),
            xtrace,
            ytraces,
            render_mode,
        })
    }

    /// Viewer plot JSON for this scatter plot.
    pub fn to_plot_json(&self) -> Value {
        let traces: Vec<Value> = self
            .ytraces
            .iter()
            .map(|(name, ytrace)| {
                json!({
                    "name": name,
                    "type": "scatter",
                    "x": self.xtrace,
                    "y": ytrace,
                    "mode": self.render_mode.as_str(),
                })
            })
            .collect();
        json!({
            "layout": {
                "title": self.title,
                "xaxis": { "title": self.xaxis_title },
                "yaxis": { "title": self.yaxis_title },
            },
            "data": traces,
        })
    }
}

/// A histogram with named sample traces; the viewer does the binning.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramPlotData {
    title: String,
    xaxis_title: String,
    traces: Vec<(String, Vec<f64>)>,
}

impl HistogramPlotData {
    pub fn new(
        title: impl Into<String>,
        xaxis_title: impl Into<String>,
        traces: Vec<(String, Vec<f64>)>,
    ) -> Self {
        Self {
            title: title.into(),
            xaxis_title: xaxis_title.into(),
            traces,
        }
    }

    /// Viewer plot JSON for this histogram.
    pub fn to_plot_json(&self) -> Value {
        let traces: Vec<Value> = self
            .traces
            .iter()
            .map(|(name, trace)| {
                json!({
                    "name": name,
                    "type": "histogram",
                    "x": trace,
                })
            })
            .collect();
        json!({
            "layout": {
                "title": self.title,
                "xaxis": { "title": self.xaxis_title },
                "yaxis": { "title": "frequency" },
            },
            "data": traces,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scatter_trace_length_mismatch() {
        let result = ScatterPlotData::new(
            "conc",
            "t",
            "n",
            vec![0.0, 1.0, 2.0],
            vec![("A".into(), vec![5.0, 4.0])],
            RenderMode::Markers,
        );
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn test_scatter_json_shape() {
        let plot = ScatterPlotData::new(
            "Concentration",
            "time (s)",
            "count",
            vec![0.0, 1.0],
            vec![("A".into(), vec![10.0, 9.0]), ("B".into(), vec![0.0, 1.0])],
            RenderMode::Lines,
        )
        .unwrap();
        let value = plot.to_plot_json();
        assert_eq!(value["layout"]["title"], "Concentration");
        assert_eq!(value["layout"]["xaxis"]["title"], "time (s)");
        assert_eq!(value["data"].as_array().unwrap().len(), 2);
        assert_eq!(value["data"][0]["type"], "scatter");
        assert_eq!(value["data"][0]["mode"], "lines");
        assert_eq!(value["data"][1]["name"], "B");
        assert_eq!(value["data"][1]["x"], json!([0.0, 1.0]));
    }

    #[test]
    fn test_histogram_json_shape() {
        let plot = HistogramPlotData::new(
            "Bond lengths",
            "length (nm)",
            vec![("A-B".into(), vec![1.0, 1.1, 0.9])],
        );
        let value = plot.to_plot_json();
        assert_eq!(value["layout"]["yaxis"]["title"], "frequency");
        assert_eq!(value["data"][0]["type"], "histogram");
        assert_eq!(value["data"][0]["x"], json!([1.0, 1.1, 0.9]));
    }
}
