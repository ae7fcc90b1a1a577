//! RSS 2.0 podcast document with the iTunes and Atom extensions.
//!
//! The document is read into a small element tree with quick-xml's event
//! reader and written back with its event writer. Namespace declarations
//! and the `version` attribute are always emitted with the canonical values,
//! whatever the parsed document carried.

use std::io;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use super::error::FeedError;

pub const RSS_VERSION: &str = "2.0";
pub const ITUNES_NAMESPACE: &str = "http://www.itunes.com/dtds/podcast-1.0.dtd";
pub const CONTENT_NAMESPACE: &str = "http://purl.org/rss/1.0/modules/content/";
pub const ATOM_NAMESPACE: &str = "http://www.w3.org/2005/Atom";
pub const AUDIO_MIME_TYPE: &str = "audio/mpeg";
pub const RSS_MIME_TYPE: &str = "application/rss+xml";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PodcastFeed {
    pub channel: Channel,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Channel {
    pub title: String,
    pub link: String,
    pub language: String,
    pub copyright: String,
    pub author: String,
    pub description: String,
    pub image_href: String,
    pub category: String,
    pub explicit: String,
    pub self_link: AtomLink,
    pub owner: Owner,
    /// Newest first.
    pub episodes: Vec<Episode>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AtomLink {
    pub href: String,
    pub rel: String,
    pub link_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Owner {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Episode {
    pub title: String,
    pub description: String,
    /// RFC 2822 timestamp.
    pub pub_date: String,
    pub enclosure: Enclosure,
    pub guid: Guid,
    pub author: String,
    /// `HH:MM:SS`.
    pub duration: String,
    pub explicit: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Enclosure {
    pub url: String,
    /// Size in bytes, kept as text since foreign documents may carry anything.
    pub length: String,
    pub mime_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Guid {
    pub value: String,
    pub is_permalink: Option<bool>,
}

impl PodcastFeed {
    pub fn episodes(&self) -> &[Episode] {
        &self.channel.episodes
    }

    /// Parses a stored feed document.
    pub fn from_xml(xml: &str) -> Result<Self, FeedError> {
        let rss = parse_tree(xml)?;
        let channel = rss
            .child("channel")
            .ok_or_else(|| FeedError::Parse("missing <channel> element".to_string()))?;
        Ok(Self {
            channel: channel_from_node(channel),
        })
    }

    /// Serializes the whole document, XML declaration included.
    pub fn to_xml(&self) -> Result<String, FeedError> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        write_document(&mut writer, self).map_err(|e| FeedError::Serialize(e.to_string()))?;
        let mut xml = String::from_utf8(writer.into_inner())
            .map_err(|e| FeedError::Serialize(e.to_string()))?;
        xml.push('\n');
        Ok(xml)
    }
}

#[derive(Debug, Default)]
struct Node {
    name: String,
    attributes: Vec<(String, String)>,
    text: String,
    children: Vec<Node>,
}

impl Node {
    fn child(&self, name: &str) -> Option<&Node> {
        self.children.iter().find(|child| child.name == name)
    }

    fn text_of(&self, name: &str) -> String {
        self.child(name)
            .map(|child| child.text.trim().to_string())
            .unwrap_or_default()
    }

    fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    fn child_attr(&self, child: &str, attr: &str) -> String {
        self.child(child)
            .and_then(|node| node.attr(attr))
            .unwrap_or_default()
            .to_string()
    }
}

fn node_from_start(start: &BytesStart) -> Result<Node, FeedError> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr
            .map_err(|e| FeedError::Parse(format!("invalid attribute on <{}>: {}", name, e)))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| FeedError::Parse(format!("invalid value for {}: {}", key, e)))?
            .into_owned();
        attributes.push((key, value));
    }
    Ok(Node {
        name,
        attributes,
        ..Node::default()
    })
}

fn current(stack: &mut [Node]) -> Result<&mut Node, FeedError> {
    stack
        .last_mut()
        .ok_or_else(|| FeedError::Parse("content outside of the root element".to_string()))
}

fn parse_tree(xml: &str) -> Result<Node, FeedError> {
    let mut reader = Reader::from_str(xml);
    // The bottom of the stack is a synthetic document node.
    let mut stack = vec![Node::default()];

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => stack.push(node_from_start(e)?),
            Ok(Event::Empty(ref e)) => {
                let node = node_from_start(e)?;
                current(&mut stack)?.children.push(node);
            }
            Ok(Event::End(_)) => {
                if stack.len() < 2 {
                    return Err(FeedError::Parse("unbalanced closing tag".to_string()));
                }
                if let Some(node) = stack.pop() {
                    current(&mut stack)?.children.push(node);
                }
            }
            Ok(Event::Text(e)) => {
                let text = e
                    .decode()
                    .map_err(|e| FeedError::Parse(format!("invalid text: {}", e)))?;
                current(&mut stack)?.text.push_str(&text);
            }
            Ok(Event::CData(e)) => {
                let text = String::from_utf8_lossy(&e.into_inner()).into_owned();
                current(&mut stack)?.text.push_str(&text);
            }
            Ok(Event::GeneralRef(e)) => {
                let resolved = match e
                    .resolve_char_ref()
                    .map_err(|e| FeedError::Parse(format!("invalid character reference: {}", e)))?
                {
                    Some(ch) => ch.to_string(),
                    None => {
                        let name = e
                            .decode()
                            .map_err(|e| FeedError::Parse(format!("invalid entity: {}", e)))?;
                        quick_xml::escape::resolve_predefined_entity(&name)
                            .map(str::to_string)
                            .ok_or_else(|| FeedError::Parse(format!("unknown entity &{};", name)))?
                    }
                };
                current(&mut stack)?.text.push_str(&resolved);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(FeedError::Parse(format!(
                    "XML error at position {}: {}",
                    reader.error_position(),
                    e
                )));
            }
        }
    }

    if stack.len() != 1 {
        return Err(FeedError::Parse("document ended inside an element".to_string()));
    }
    let document = stack.pop().unwrap_or_default();
    document
        .children
        .into_iter()
        .find(|node| node.name == "rss")
        .ok_or_else(|| FeedError::Parse("missing <rss> root element".to_string()))
}

fn channel_from_node(node: &Node) -> Channel {
    let self_link = node.child("atom:link");
    let owner = node.child("itunes:owner");

    Channel {
        title: node.text_of("title"),
        link: node.text_of("link"),
        language: node.text_of("language"),
        copyright: node.text_of("copyright"),
        author: node.text_of("itunes:author"),
        description: node.text_of("description"),
        image_href: node.child_attr("itunes:image", "href"),
        category: node.child_attr("itunes:category", "text"),
        explicit: node.text_of("itunes:explicit"),
        self_link: AtomLink {
            href: self_link.and_then(|n| n.attr("href")).unwrap_or_default().to_string(),
            rel: self_link.and_then(|n| n.attr("rel")).unwrap_or_default().to_string(),
            link_type: self_link.and_then(|n| n.attr("type")).unwrap_or_default().to_string(),
        },
        owner: Owner {
            name: owner.map(|n| n.text_of("itunes:name")).unwrap_or_default(),
            email: owner.map(|n| n.text_of("itunes:email")).unwrap_or_default(),
        },
        episodes: node
            .children
            .iter()
            .filter(|child| child.name == "item")
            .map(episode_from_node)
            .collect(),
    }
}

fn episode_from_node(node: &Node) -> Episode {
    let guid = node.child("guid");
    Episode {
        title: node.text_of("title"),
        description: node.text_of("description"),
        pub_date: node.text_of("pubDate"),
        enclosure: Enclosure {
            url: node.child_attr("enclosure", "url"),
            length: node.child_attr("enclosure", "length"),
            mime_type: node.child_attr("enclosure", "type"),
        },
        guid: Guid {
            value: node.text_of("guid"),
            is_permalink: guid
                .and_then(|n| n.attr("isPermaLink"))
                .map(|value| value.trim().eq_ignore_ascii_case("true")),
        },
        author: node.text_of("itunes:author"),
        duration: node.text_of("itunes:duration"),
        explicit: node.text_of("itunes:explicit"),
    }
}

type XmlWriter = Writer<Vec<u8>>;

fn write_text_element(writer: &mut XmlWriter, name: &str, text: &str) -> io::Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))
}

fn write_empty_element(writer: &mut XmlWriter, name: &str, attrs: &[(&str, &str)]) -> io::Result<()> {
    let element = BytesStart::new(name).with_attributes(attrs.iter().copied());
    writer.write_event(Event::Empty(element))
}

fn write_document(writer: &mut XmlWriter, feed: &PodcastFeed) -> io::Result<()> {
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let rss = BytesStart::new("rss").with_attributes([
        ("version", RSS_VERSION),
        ("xmlns:itunes", ITUNES_NAMESPACE),
        ("xmlns:content", CONTENT_NAMESPACE),
        ("xmlns:atom", ATOM_NAMESPACE),
    ]);
    writer.write_event(Event::Start(rss))?;
    write_channel(writer, &feed.channel)?;
    writer.write_event(Event::End(BytesEnd::new("rss")))
}

fn write_channel(writer: &mut XmlWriter, channel: &Channel) -> io::Result<()> {
    writer.write_event(Event::Start(BytesStart::new("channel")))?;

    write_text_element(writer, "title", &channel.title)?;
    write_text_element(writer, "link", &channel.link)?;
    write_text_element(writer, "language", &channel.language)?;
    write_text_element(writer, "copyright", &channel.copyright)?;
    write_text_element(writer, "itunes:author", &channel.author)?;
    write_text_element(writer, "description", &channel.description)?;
    write_empty_element(writer, "itunes:image", &[("href", channel.image_href.as_str())])?;
    write_empty_element(writer, "itunes:category", &[("text", channel.category.as_str())])?;
    write_text_element(writer, "itunes:explicit", &channel.explicit)?;
    write_empty_element(
        writer,
        "atom:link",
        &[
            ("href", channel.self_link.href.as_str()),
            ("rel", channel.self_link.rel.as_str()),
            ("type", channel.self_link.link_type.as_str()),
        ],
    )?;

    writer.write_event(Event::Start(BytesStart::new("itunes:owner")))?;
    write_text_element(writer, "itunes:name", &channel.owner.name)?;
    write_text_element(writer, "itunes:email", &channel.owner.email)?;
    writer.write_event(Event::End(BytesEnd::new("itunes:owner")))?;

    for episode in &channel.episodes {
        write_episode(writer, episode)?;
    }

    writer.write_event(Event::End(BytesEnd::new("channel")))
}

fn write_episode(writer: &mut XmlWriter, episode: &Episode) -> io::Result<()> {
    writer.write_event(Event::Start(BytesStart::new("item")))?;

    write_text_element(writer, "title", &episode.title)?;
    write_text_element(writer, "description", &episode.description)?;
    write_text_element(writer, "pubDate", &episode.pub_date)?;
    write_empty_element(
        writer,
        "enclosure",
        &[
            ("url", episode.enclosure.url.as_str()),
            ("length", episode.enclosure.length.as_str()),
            ("type", episode.enclosure.mime_type.as_str()),
        ],
    )?;

    let mut guid = BytesStart::new("guid");
    if let Some(is_permalink) = episode.guid.is_permalink {
        guid.push_attribute(("isPermaLink", if is_permalink { "true" } else { "false" }));
    }
    writer.write_event(Event::Start(guid))?;
    writer.write_event(Event::Text(BytesText::new(&episode.guid.value)))?;
    writer.write_event(Event::End(BytesEnd::new("guid")))?;

    write_text_element(writer, "itunes:author", &episode.author)?;
    write_text_element(writer, "itunes:duration", &episode.duration)?;
    write_text_element(writer, "itunes:explicit", &episode.explicit)?;

    writer.write_event(Event::End(BytesEnd::new("item")))
}
