// ABOUTME: get_reservoir_info - reservoir level, storage, inflow and crest
// ABOUTME: elevation for a date, narrowed by reservoir name and district.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use super::matching::{resolve_name, retain_named};
use super::{HydroApi, Record, nullable, supplied};
use crate::tool::{Arguments, ParamSpec, Tool, ToolOutput};

static DAM_TOP_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[(（]坝上[)）]").expect("valid dam-top pattern"));

const UNITS: [(&str, &str); 4] = [
    ("库水位", "米"),
    ("蓄水量", "亿立方米"),
    ("入库流速", "米/秒"),
    ("坝顶高程", "米"),
];

/// Looks up reservoir readings.
pub struct ReservoirTool {
    api: Arc<HydroApi>,
}

impl ReservoirTool {
    pub fn new(api: Arc<HydroApi>) -> Self {
        Self { api }
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct Params {
    pubtime: String,
    #[serde(deserialize_with = "nullable")]
    reservoir_name: Option<String>,
    #[serde(deserialize_with = "nullable")]
    admi_area: Option<String>,
}

/// Drop the "(坝上)" gauge-position marker from a reservoir name.
fn strip_dam_top(name: &str) -> String {
    DAM_TOP_SUFFIX.replace_all(name, "").into_owned()
}

/// Append display units to the measured fields of `record`.
fn annotate_units(record: &mut Record) {
    for (field, unit) in UNITS {
        if let Some(value) = record.get_mut(field) {
            let text = match &*value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            *value = Value::String(format!("{}{}", text, unit));
        }
    }
}

#[async_trait]
impl Tool for ReservoirTool {
    fn name(&self) -> &str {
        "get_reservoir_info"
    }

    fn description(&self) -> &str {
        "根据时间，行政区，水库名等相关参数按要求查询水库的库水位，蓄水量，入库流速，坝顶高度。\n\n\
         Records are filtered by the closest matching district and reservoir name; \
         the first result carries units."
    }

    fn params(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::required("pubtime", "str", "记录的时间"),
            ParamSpec::required("reservoir_name", "str", "水库的名字"),
            ParamSpec::required("admi_area", "str", "行政区"),
        ]
    }

    async fn call(&self, args: Arguments) -> Result<ToolOutput, anyhow::Error> {
        let params: Params = serde_json::from_value(Value::Object(args))?;
        let mut records = self.api.reservoirs(&params.pubtime).await?;

        for record in &mut records {
            if let Some(Value::String(name)) = record.get_mut("库名") {
                *name = strip_dam_top(name);
            }
        }

        let area = resolve_name(&records, "行政区", supplied(params.admi_area).as_deref());
        let reservoir = resolve_name(&records, "库名", supplied(params.reservoir_name).as_deref());
        retain_named(&mut records, "行政区", area.as_deref());
        retain_named(&mut records, "库名", reservoir.as_deref());

        if let Some(first) = records.first_mut() {
            annotate_units(first);
        }
        tracing::info!(
            pubtime = %params.pubtime,
            reservoir = ?reservoir,
            area = ?area,
            matches = records.len(),
            "reservoir lookup"
        );
        Ok(ToolOutput::json(records)?)
    }
}
