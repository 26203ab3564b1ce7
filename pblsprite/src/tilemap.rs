//! Tileset geometry from Tiled maps, either TMX (XML) or JSON.
use serde::Deserialize;
use snafu::{ensure, OptionExt, ResultExt, Snafu};
use std::{
    path::{Path, PathBuf},
    str::FromStr,
};

#[derive(Debug, Snafu)]
pub enum TileMapError {
    #[snafu(display("Failed to read tile map `{}`", path.display()))]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to parse tile map `{}`", path.display()))]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[snafu(display("Failed to parse TMX map `{}`", path.display()))]
    Xml {
        path: PathBuf,
        source: roxmltree::Error,
    },
    #[snafu(display("Expected a `<map>` root element, found `<{element}>`"))]
    UnexpectedRoot { element: String },
    #[snafu(display("Tileset `{tileset}`: {reason}"))]
    MalformedTileGeometry {
        tileset: String,
        reason: &'static str,
    },
}

/// Everything needed to cut one tileset image into tiles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TilesetGeometry {
    pub name: String,
    pub tile_width: u32,
    pub tile_height: u32,
    /// Horizontal gap between tiles.
    pub xspacing: u32,
    /// Vertical gap between tiles.
    pub yspacing: u32,
    /// Pixel position of the first tile in the image.
    pub offset: (i32, i32),
    pub image: PathBuf,
    pub columns: u32,
    pub rows: u32,
}

impl TilesetGeometry {
    pub fn tile_count(&self) -> u64 {
        u64::from(self.columns) * u64::from(self.rows)
    }

    /// Crop rectangle `(x, y, width, height)` of the tile in column `x`, row `y`, or `None` if
    /// the position does not fit into an `i64`.
    pub fn tile_rect(&self, x: u32, y: u32) -> Option<(i64, i64, u32, u32)> {
        let step_x = i64::from(self.tile_width) + i64::from(self.xspacing);
        let step_y = i64::from(self.tile_height) + i64::from(self.yspacing);

        let left = step_x
            .checked_mul(i64::from(x))?
            .checked_add(i64::from(self.offset.0))?;
        let top = step_y
            .checked_mul(i64::from(y))?
            .checked_add(i64::from(self.offset.1))?;

        Some((left, top, self.tile_width, self.tile_height))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileMap {
    /// Tilesets in declaration order.
    pub tilesets: Vec<TilesetGeometry>,
}

#[derive(Debug, Deserialize)]
struct RawMap {
    #[serde(default)]
    tilesets: Vec<RawTileset>,
}

#[derive(Debug, Default, Deserialize)]
struct RawTileset {
    #[serde(default)]
    name: String,
    #[serde(default)]
    tilewidth: u32,
    #[serde(default)]
    tileheight: u32,
    #[serde(default)]
    spacing: u32,
    #[serde(default)]
    columns: u32,
    #[serde(default)]
    tilecount: u32,
    image: Option<String>,
    #[serde(default)]
    imagewidth: u32,
    #[serde(default)]
    imageheight: u32,
    tileoffset: Option<RawOffset>,
    #[serde(default)]
    properties: Vec<RawProperty>,
    /// Set for tilesets stored in a separate file.
    source: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawOffset {
    #[serde(default)]
    x: i32,
    #[serde(default)]
    y: i32,
}

#[derive(Debug, Deserialize)]
struct RawProperty {
    name: String,
    #[serde(default)]
    value: serde_json::Value,
}

impl TileMap {
    /// Loads a `.tmx` map as XML, anything else as JSON.
    pub fn load(path: &Path) -> Result<Self, TileMapError> {
        let text = std::fs::read_to_string(path).context(ReadSnafu { path })?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));

        let is_tmx = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("tmx"));
        let map = if is_tmx {
            TileMap::from_tmx(&text, base)
        } else {
            TileMap::from_json(&text, base)
        };

        map.map_err(|e| match e {
            TileMapError::Parse { source, .. } => TileMapError::Parse {
                path: path.to_owned(),
                source,
            },
            TileMapError::Xml { source, .. } => TileMapError::Xml {
                path: path.to_owned(),
                source,
            },
            e => e,
        })
    }

    /// Parses a JSON map; relative image paths are resolved against `base`.
    pub fn from_json(json: &str, base: &Path) -> Result<Self, TileMapError> {
        let raw: RawMap = serde_json::from_str(json).context(ParseSnafu { path: base })?;
        TileMap::from_raw(raw.tilesets, base)
    }

    /// Parses a TMX map; relative image paths are resolved against `base`.
    pub fn from_tmx(xml: &str, base: &Path) -> Result<Self, TileMapError> {
        let doc = roxmltree::Document::parse(xml).context(XmlSnafu { path: base })?;
        let root = doc.root_element();
        ensure!(
            root.has_tag_name("map"),
            UnexpectedRootSnafu {
                element: root.tag_name().name()
            }
        );

        let tilesets = root
            .children()
            .filter(|node| node.has_tag_name("tileset"))
            .map(RawTileset::from_tmx)
            .collect::<Result<_, _>>()?;

        TileMap::from_raw(tilesets, base)
    }

    fn from_raw(tilesets: Vec<RawTileset>, base: &Path) -> Result<Self, TileMapError> {
        let tilesets = tilesets
            .into_iter()
            .map(|tileset| tileset.into_geometry(base))
            .collect::<Result<_, _>>()?;

        Ok(TileMap { tilesets })
    }
}

/// Number of tiles of size `tile` with `spacing` between them that fit into `extent`.
fn tiles_along(extent: u32, tile: u32, spacing: u32) -> Option<u32> {
    let step = u64::from(tile) + u64::from(spacing);
    let count = (u64::from(extent) + u64::from(spacing)).checked_div(step)?;
    u32::try_from(count).ok()
}

fn xml_attr<T: FromStr>(
    node: roxmltree::Node,
    name: &str,
    tileset: &str,
) -> Result<Option<T>, TileMapError> {
    let Some(value) = node.attribute(name) else {
        return Ok(None);
    };

    value
        .trim()
        .parse()
        .ok()
        .map(Some)
        .context(MalformedTileGeometrySnafu {
            tileset,
            reason: "tileset attributes must be integers",
        })
}

impl RawTileset {
    fn from_tmx(node: roxmltree::Node) -> Result<Self, TileMapError> {
        let name = node.attribute("name").unwrap_or_default().to_owned();
        let attr = |node, key| xml_attr::<u32>(node, key, &name);

        let mut tileset = RawTileset {
            tilewidth: attr(node, "tilewidth")?.unwrap_or_default(),
            tileheight: attr(node, "tileheight")?.unwrap_or_default(),
            spacing: attr(node, "spacing")?.unwrap_or_default(),
            columns: attr(node, "columns")?.unwrap_or_default(),
            tilecount: attr(node, "tilecount")?.unwrap_or_default(),
            source: node.attribute("source").map(str::to_owned),
            ..RawTileset::default()
        };

        for child in node.children().filter(|n| n.is_element()) {
            match child.tag_name().name() {
                "image" => {
                    tileset.image = child.attribute("source").map(str::to_owned);
                    tileset.imagewidth = attr(child, "width")?.unwrap_or_default();
                    tileset.imageheight = attr(child, "height")?.unwrap_or_default();
                }
                "tileoffset" => {
                    tileset.tileoffset = Some(RawOffset {
                        x: xml_attr(child, "x", &name)?.unwrap_or_default(),
                        y: xml_attr(child, "y", &name)?.unwrap_or_default(),
                    });
                }
                "properties" => {
                    tileset.properties = child
                        .children()
                        .filter(|n| n.has_tag_name("property"))
                        .map(|property| RawProperty {
                            name: property.attribute("name").unwrap_or_default().to_owned(),
                            value: property
                                .attribute("value")
                                .or_else(|| property.text())
                                .map(|v| serde_json::Value::String(v.to_owned()))
                                .unwrap_or_default(),
                        })
                        .collect();
                }
                _ => {}
            }
        }

        tileset.name = name;
        Ok(tileset)
    }

    fn property(&self, name: &str) -> Result<Option<u32>, TileMapError> {
        let Some(property) = self.properties.iter().find(|p| p.name == name) else {
            return Ok(None);
        };

        let value = match &property.value {
            serde_json::Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        };
        value
            .map(Some)
            .context(MalformedTileGeometrySnafu {
                tileset: &self.name,
                reason: "spacing properties must be non-negative integers",
            })
    }

    fn into_geometry(self, base: &Path) -> Result<TilesetGeometry, TileMapError> {
        let malformed = |reason| MalformedTileGeometrySnafu {
            tileset: self.name.clone(),
            reason,
        };

        ensure!(
            self.source.is_none(),
            malformed("external tilesets are not supported, embed the tileset in the map")
        );
        ensure!(
            self.tilewidth > 0 && self.tileheight > 0,
            malformed("tile width and height must be non-zero")
        );
        let image = self
            .image
            .as_deref()
            .filter(|image| !image.is_empty())
            .context(malformed("tileset has no image"))?;

        let xspacing = self.property("xspacing")?.unwrap_or(self.spacing);
        let yspacing = self.property("yspacing")?.unwrap_or(self.spacing);

        let columns = if self.columns > 0 {
            self.columns
        } else {
            tiles_along(self.imagewidth, self.tilewidth, xspacing)
                .context(malformed("tileset is too wide"))?
        };
        let rows = if self.tilecount > 0 && columns > 0 {
            self.tilecount / columns
        } else {
            tiles_along(self.imageheight, self.tileheight, yspacing)
                .context(malformed("tileset is too high"))?
        };
        ensure!(
            columns.checked_mul(rows).is_some(),
            malformed("tileset has too many tiles")
        );

        let offset = self
            .tileoffset
            .as_ref()
            .map(|o| (o.x, o.y))
            .unwrap_or_default();

        Ok(TilesetGeometry {
            image: base.join(image),
            name: self.name,
            tile_width: self.tilewidth,
            tile_height: self.tileheight,
            xspacing,
            yspacing,
            offset,
            columns,
            rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAP: &str = r#"{
        "type": "map",
        "tilesets": [
            {
                "firstgid": 1,
                "name": "mario",
                "image": "mario.png",
                "imagewidth": 70,
                "imageheight": 48,
                "tilewidth": 16,
                "tileheight": 24,
                "spacing": 2,
                "columns": 4,
                "tilecount": 8
            },
            {
                "firstgid": 9,
                "name": "coins",
                "image": "art/coins.png",
                "imagewidth": 40,
                "imageheight": 10,
                "tilewidth": 8,
                "tileheight": 8,
                "tileoffset": { "x": 2, "y": 1 },
                "properties": [
                    { "name": "xspacing", "type": "int", "value": 4 },
                    { "name": "yspacing", "type": "string", "value": "1" }
                ]
            }
        ]
    }"#;

    const TMX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<map version="1.0" orientation="orthogonal" width="10" height="10" tilewidth="16" tileheight="16">
 <tileset firstgid="1" name="mario" tilewidth="16" tileheight="24" spacing="2" tilecount="8" columns="4">
  <image source="mario.png" width="70" height="48"/>
 </tileset>
 <tileset firstgid="9" name="coins" tilewidth="8" tileheight="8">
  <tileoffset x="2" y="1"/>
  <properties>
   <property name="xspacing" type="int" value="4"/>
   <property name="yspacing" value="1"/>
  </properties>
  <image source="art/coins.png" width="40" height="10"/>
 </tileset>
 <layer name="ground" width="10" height="10">
  <data encoding="csv">1</data>
 </layer>
</map>
"#;

    fn assert_geometry(map: &TileMap) {
        assert_eq!(map.tilesets.len(), 2);

        let mario = &map.tilesets[0];
        assert_eq!(mario.name, "mario");
        assert_eq!(mario.image, Path::new("levels/mario.png"));
        assert_eq!((mario.xspacing, mario.yspacing), (2, 2));
        assert_eq!((mario.columns, mario.rows), (4, 2));
        assert_eq!(mario.tile_rect(1, 1), Some((18, 26, 16, 24)));

        let coins = &map.tilesets[1];
        assert_eq!(coins.name, "coins");
        assert_eq!(coins.image, Path::new("levels/art/coins.png"));
        assert_eq!(coins.offset, (2, 1));
        assert_eq!((coins.xspacing, coins.yspacing), (4, 1));
        // (40 + 4) / 12, (10 + 1) / 9
        assert_eq!((coins.columns, coins.rows), (3, 1));
        assert_eq!(coins.tile_rect(2, 0), Some((26, 1, 8, 8)));
        assert_eq!(coins.tile_count(), 3);
    }

    #[test]
    fn geometry() {
        let map = TileMap::from_json(MAP, Path::new("levels")).unwrap();
        assert_geometry(&map);
    }

    #[test]
    fn tmx_geometry() {
        let map = TileMap::from_tmx(TMX, Path::new("levels")).unwrap();
        assert_geometry(&map);
        assert_eq!(map, TileMap::from_json(MAP, Path::new("levels")).unwrap());
    }

    #[test]
    fn load_picks_format_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let tmx = dir.path().join("level.TMX");
        let json = dir.path().join("level.json");
        std::fs::write(&tmx, TMX).unwrap();
        std::fs::write(&json, MAP).unwrap();

        let from_tmx = TileMap::load(&tmx).unwrap();
        let from_json = TileMap::load(&json).unwrap();
        assert_eq!(from_tmx, from_json);
        assert_eq!(from_tmx.tilesets[0].image, dir.path().join("mario.png"));

        std::fs::write(&tmx, MAP).unwrap();
        assert!(matches!(
            TileMap::load(&tmx),
            Err(TileMapError::Xml { path, .. }) if path == tmx
        ));
    }

    #[test]
    fn malformed() {
        let zero = r#"{"tilesets": [{"name": "z", "image": "a.png", "tilewidth": 0, "tileheight": 8}]}"#;
        assert!(matches!(
            TileMap::from_json(zero, Path::new("")),
            Err(TileMapError::MalformedTileGeometry { .. })
        ));

        let no_image = r#"{"tilesets": [{"name": "n", "tilewidth": 8, "tileheight": 8}]}"#;
        assert!(matches!(
            TileMap::from_json(no_image, Path::new("")),
            Err(TileMapError::MalformedTileGeometry { tileset, .. }) if tileset == "n"
        ));

        let external = r#"{"tilesets": [{"firstgid": 1, "source": "tiles.tsj"}]}"#;
        assert!(matches!(
            TileMap::from_json(external, Path::new("")),
            Err(TileMapError::MalformedTileGeometry { .. })
        ));

        let bad_property = r#"{"tilesets": [{"name": "p", "image": "a.png", "tilewidth": 8,
            "tileheight": 8, "properties": [{"name": "xspacing", "value": "wide"}]}]}"#;
        assert!(matches!(
            TileMap::from_json(bad_property, Path::new("")),
            Err(TileMapError::MalformedTileGeometry { .. })
        ));
    }

    #[test]
    fn malformed_tmx() {
        let external = r#"<map><tileset firstgid="1" source="tiles.tsx"/></map>"#;
        assert!(matches!(
            TileMap::from_tmx(external, Path::new("")),
            Err(TileMapError::MalformedTileGeometry { .. })
        ));

        let bad_width = r#"<map><tileset name="w" tilewidth="-8" tileheight="8">
            <image source="a.png" width="8" height="8"/></tileset></map>"#;
        assert!(matches!(
            TileMap::from_tmx(bad_width, Path::new("")),
            Err(TileMapError::MalformedTileGeometry { tileset, .. }) if tileset == "w"
        ));

        assert!(matches!(
            TileMap::from_tmx("<tileset/>", Path::new("")),
            Err(TileMapError::UnexpectedRoot { element }) if element == "tileset"
        ));
    }

    #[test]
    fn huge_values_are_rejected() {
        let huge = format!(
            r#"{{"tilesets": [{{"name": "h", "image": "a.png", "tilewidth": 1, "tileheight": 1,
                "imagewidth": {max}, "imageheight": {max}}}]}}"#,
            max = u32::MAX
        );
        assert!(matches!(
            TileMap::from_json(&huge, Path::new("")),
            Err(TileMapError::MalformedTileGeometry { .. })
        ));

        let spaced = format!(
            r#"{{"tilesets": [{{"name": "s", "image": "a.png", "tilewidth": {max},
                "tileheight": 1, "spacing": {max}, "imagewidth": {max}, "imageheight": 1}}]}}"#,
            max = u32::MAX
        );
        let map = TileMap::from_json(&spaced, Path::new("")).unwrap();
        assert_eq!(map.tilesets[0].columns, 1);

        let geometry = TilesetGeometry {
            name: "far".into(),
            tile_width: u32::MAX,
            tile_height: 1,
            xspacing: u32::MAX,
            yspacing: 0,
            offset: (i32::MAX, 0),
            image: PathBuf::new(),
            columns: u32::MAX,
            rows: 1,
        };
        assert_eq!(geometry.tile_count(), u64::from(u32::MAX));
        assert_eq!(geometry.tile_rect(u32::MAX, 0), None);
        assert_eq!(geometry.tile_rect(0, 0), Some((i64::from(i32::MAX), 0, u32::MAX, 1)));
    }

    #[test]
    fn not_json() {
        assert!(matches!(
            TileMap::from_json("<map/>", Path::new("")),
            Err(TileMapError::Parse { .. })
        ));
    }
}
