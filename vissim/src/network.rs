//! Road geometry from a network file (`.inpx`). Links nest their shape points and lanes at
//! varying depths, so rather than indexing fixed levels, every link is walked recursively: a
//! group whose children are points contributes vertices, any element with `width` contributes a
//! lane width, and everything else is just descended into.

use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::records::{slurp, slurp_path};
use crate::{Error, GeoPoint, Result, Transformer};

const LINKS_TAG: &str = "links";

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub x: f64,
    pub y: f64,
    pub z_offset: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Link {
    /// The `no` attribute
    pub number: Option<String>,
    pub name: Option<String>,
    /// In local coordinates, in traversal order
    pub vertices: Vec<Vertex>,
    /// Index-aligned with `vertices`
    pub points: Vec<GeoPoint>,
    /// The first of `lane_widths`
    pub width: Option<f64>,
    pub lane_widths: Vec<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Network {
    pub links: Vec<Link>,
}

impl Network {
    pub fn vertex_count(&self) -> usize {
        self.links.iter().map(|link| link.vertices.len()).sum()
    }
}

pub fn load<R: Read>(reader: R, transformer: &Transformer) -> Result<Network> {
    parse(&slurp(reader, "network")?, transformer)
}

pub fn load_path<P: AsRef<Path>>(path: P, transformer: &Transformer) -> Result<Network> {
    parse(&slurp_path(path.as_ref())?, transformer)
}

pub fn parse(text: &str, transformer: &Transformer) -> Result<Network> {
    let tree = roxmltree::Document::parse(text)
        .map_err(|err| Error::MalformedNetworkDocument(err.to_string()))?;
    let root = tree.root_element();
    if !is_closed(text, root) {
        return Err(Error::MalformedNetworkDocument(format!(
            "<{}> is never closed",
            root.tag_name().name()
        )));
    }
    let links = if root.has_tag_name(LINKS_TAG) {
        root
    } else {
        root.children()
            .find(|node| node.has_tag_name(LINKS_TAG))
            .ok_or_else(|| {
                Error::MalformedNetworkDocument(format!(
                    "<{}> has no <{LINKS_TAG}>",
                    root.tag_name().name()
                ))
            })?
    };

    let mut network = Network { links: Vec::new() };
    for node in links.children().filter(|node| node.is_element()) {
        let mut link = Link {
            number: node.attribute("no").map(|x| x.to_string()),
            name: node.attribute("name").map(|x| x.to_string()),
            vertices: Vec::new(),
            points: Vec::new(),
            width: None,
            lane_widths: Vec::new(),
        };
        scrape(node, &mut link, transformer);
        link.width = link.lane_widths.first().copied();
        if link.vertices.is_empty() {
            debug!("Link {:?} has no geometry", link.number);
        }
        network.links.push(link);
    }
    Ok(network)
}

/// The parser tolerates a document that ends before its root element does, so check that the
/// element's source ends with its own closing tag.
fn is_closed(text: &str, root: roxmltree::Node) -> bool {
    let source = match text.get(root.range()) {
        Some(source) => source,
        None => return false,
    };
    // Attribute values can't hold a raw `<`, so a self-closing root has exactly one
    if source.ends_with("/>") && source.matches('<').count() == 1 {
        return true;
    }
    let name = root.tag_name().name();
    source
        .strip_suffix('>')
        .and_then(|body| body.rfind("</").map(|idx| body[idx + 2..].trim_end()))
        .map_or(false, |closing| {
            closing == name || closing.ends_with(&format!(":{name}"))
        })
}

fn scrape(node: roxmltree::Node, link: &mut Link, transformer: &Transformer) {
    if let Some(raw) = node.attribute("width") {
        match raw.trim().parse::<f64>() {
            Ok(width) => link.lane_widths.push(width),
            Err(_) => debug!("Link {:?} has a bad width {:?}", link.number, raw),
        }
    }

    // The leading run of point children forms this level's vertex list. Anything after the first
    // child that isn't a point is only descended into.
    let mut children = node.children().filter(|child| child.is_element()).peekable();
    while let Some((vertex, pt)) = children
        .peek()
        .and_then(|child| as_vertex(*child, transformer))
    {
        link.vertices.push(vertex);
        link.points.push(pt);
        children.next();
    }
    for child in children {
        scrape(child, link, transformer);
    }
}

/// `x` and `y` are required, `zOffset` defaults to 0.
fn as_vertex(node: roxmltree::Node, transformer: &Transformer) -> Option<(Vertex, GeoPoint)> {
    let x = node.attribute("x")?.trim().parse::<f64>().ok()?;
    let y = node.attribute("y")?.trim().parse::<f64>().ok()?;
    let z_offset = match node.attribute("zOffset") {
        Some(raw) => raw.trim().parse::<f64>().ok()?,
        None => 0.0,
    };
    let pt = transformer.checked_transform(x, y)?;
    Some((Vertex { x, y, z_offset }, pt))
}
