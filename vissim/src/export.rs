use std::io::Write;

use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue, Value};

use crate::{GeoPoint, Network, Table};

impl Network {
    /// One feature for the whole network, with every link as one line of a MultiLineString.
    /// Links without geometry are kept as empty lines, so line `i` is always link `i`.
    pub fn to_geojson(&self) -> FeatureCollection {
        let lines: Vec<Vec<Vec<f64>>> = self
            .links
            .iter()
            .map(|link| link.points.iter().map(position).collect())
            .collect();
        let feature = Feature {
            bbox: None,
            geometry: Some(Geometry::new(Value::MultiLineString(lines))),
            id: None,
            properties: Some(JsonObject::new()),
            foreign_members: None,
        };
        FeatureCollection {
            bbox: None,
            features: vec![feature],
            foreign_members: None,
        }
    }
}

impl Table {
    /// One point per row, in order, with every output column as a property. Rows without a
    /// position still get a feature, with no geometry.
    pub fn to_geojson(&self) -> FeatureCollection {
        let columns = self.output_columns();
        let mut features = Vec::new();
        for row in &self.rows {
            let mut properties = JsonObject::new();
            for (column, value) in columns.iter().zip(self.output_values(row)) {
                properties.insert(
                    column.clone(),
                    value.map(JsonValue::String).unwrap_or(JsonValue::Null),
                );
            }
            features.push(Feature {
                bbox: None,
                geometry: row
                    .position
                    .map(|pt| Geometry::new(Value::Point(position(&pt)))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            });
        }
        FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        }
    }

    /// Absent values become empty fields.
    pub fn write_csv<W: Write>(&self, writer: W) -> csv::Result<()> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(self.output_columns())?;
        for row in &self.rows {
            writer.write_record(
                self.output_values(row)
                    .into_iter()
                    .map(|value| value.unwrap_or_default()),
            )?;
        }
        writer.flush()?;
        Ok(())
    }
}

fn position(pt: &GeoPoint) -> Vec<f64> {
    vec![pt.longitude, pt.latitude]
}

#[cfg(test)]
mod tests {
    use crate::{network, trajectory, ReferenceFrame, TrajectoryConfig, Transformer};

    fn transformer() -> Transformer {
        Transformer::new(ReferenceFrame::default()).unwrap()
    }

    #[test]
    fn network_is_one_multilinestring() {
        let text = r#"<network><links>
            <link no="1"><geometry><pts><p x="0" y="0" zOffset="0"/><p x="10" y="0" zOffset="0"/></pts></geometry></link>
            <link no="2"/>
            <link no="3"><geometry><pts><p x="5" y="5" zOffset="0"/></pts></geometry></link>
        </links></network>"#;
        let gj = network::parse(text, &transformer()).unwrap().to_geojson();
        assert_eq!(gj.features.len(), 1);

        let geometry = gj.features[0].geometry.as_ref().unwrap();
        match &geometry.value {
            geojson::Value::MultiLineString(lines) => {
                assert_eq!(
                    lines.iter().map(|line| line.len()).collect::<Vec<_>>(),
                    vec![2, 0, 1]
                );
                let origin = transformer().transform(0.0, 0.0);
                assert_eq!(lines[0][0], vec![origin.longitude, origin.latitude]);
            }
            x => panic!("Unexpected geometry {:?}", x),
        }
    }

    fn trajectory_table() -> crate::Table {
        let text = "a\nb\nc\nDate: 2024-01-01\nVEHICLE;POS;POSLAT\n'0.0;100.0;200.0ABCDE'\n'1.5;bad;200.0ABCDE'\n";
        trajectory::parse(text, &TrajectoryConfig::default(), &transformer()).unwrap()
    }

    #[test]
    fn trajectory_points() {
        let gj = trajectory_table().to_geojson();
        assert_eq!(gj.features.len(), 2);

        let first = &gj.features[0];
        let pt = transformer().transform(100.0, 200.0);
        assert_eq!(
            first.geometry.as_ref().map(|g| g.value.clone()),
            Some(geojson::Value::Point(vec![pt.longitude, pt.latitude]))
        );
        let props = first.properties.as_ref().unwrap();
        assert_eq!(props["POSLAT"], "200.0");
        assert_eq!(props["datetime"], "2024-01-01 00:00:00");
        assert_eq!(props["POS_wgs"], pt.longitude.to_string().as_str());

        let second = &gj.features[1];
        assert!(second.geometry.is_none());
        assert!(second.properties.as_ref().unwrap()["POS_wgs"].is_null());
    }

    #[test]
    fn csv_output() {
        let mut out = Vec::new();
        trajectory_table().write_csv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "VEHICLE,POS,POSLAT,datetime,POS_wgs,POSLAT_wgs");
        let pt = transformer().transform(100.0, 200.0);
        assert_eq!(
            lines[1],
            format!(
                "0.0,100.0,200.0,2024-01-01 00:00:00,{},{}",
                pt.longitude, pt.latitude
            )
        );
        assert_eq!(lines[2], "1.5,bad,200.0,2024-01-01 00:00:01.500,,");
    }
}
