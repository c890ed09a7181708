// ABOUTME: get_rain_info - daily rainfall per gauge station for a date,
// ABOUTME: narrowed by station name and district.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::matching::{resolve_name, retain_named};
use super::{HydroApi, nullable, supplied};
use crate::tool::{Arguments, ParamSpec, Tool, ToolOutput};

pub struct RainTool {
    api: Arc<HydroApi>,
}

impl RainTool {
    pub fn new(api: Arc<HydroApi>) -> Self {
        Self { api }
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct Params {
    pubtime: String,
    #[serde(deserialize_with = "nullable")]
    station_name: Option<String>,
    #[serde(deserialize_with = "nullable")]
    admi_area: Option<String>,
}

#[async_trait]
impl Tool for RainTool {
    fn name(&self) -> &str {
        "get_rain_info"
    }

    fn description(&self) -> &str {
        "根据时间，行政区，站名等相关参数按要求查询水库的日雨量。"
    }

    fn params(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::required("pubtime", "str", "记录的时间"),
            ParamSpec::required("station_name", "str", "站点的名字"),
            ParamSpec::required("admi_area", "str", "行政区"),
        ]
    }

    async fn call(&self, args: Arguments) -> Result<ToolOutput, anyhow::Error> {
        let params: Params = serde_json::from_value(Value::Object(args))?;
        let mut records = self.api.rain(&params.pubtime).await?;

        let area = resolve_name(&records, "行政区", supplied(params.admi_area).as_deref());
        let station = resolve_name(&records, "站名", supplied(params.station_name).as_deref());
        retain_named(&mut records, "行政区", area.as_deref());
        retain_named(&mut records, "站名", station.as_deref());

        tracing::info!(
            pubtime = %params.pubtime,
            station = ?station,
            area = ?area,
            matches = records.len(),
            "rain lookup"
        );
        Ok(ToolOutput::json(records)?)
    }
}
