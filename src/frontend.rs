use crate::media::{self, CdnConfig};
use crate::model::{AspectRatio, MediaItem, Project, ProjectsPayload};
use gloo_net::http::Request;
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::spawn_local;
use web_sys::{
    window, Event, MouseEvent, ScrollBehavior, ScrollIntoViewOptions, ScrollLogicalPosition,
};
use yew::prelude::*;

const FALLBACK_ALT: &str = "Project thumbnail";
const MISSING_VIDEO_LABEL: &str = "Video unavailable";

fn cdn_config() -> CdnConfig {
    CdnConfig::new(
        option_env!("CONTENT_PROJECT_ID").unwrap_or("f6mhnkv2"),
        option_env!("CONTENT_DATASET").unwrap_or("production"),
    )
}

/// Scrolls the section tagged with the given project id into the middle of
/// the viewport. Does nothing when no matching section exists.
fn scroll_to_project(project_id: &str) {
    let Some(document) = window().and_then(|w| w.document()) else {
        return;
    };

    let selector = format!("[data-project-id=\"{}\"]", project_id.replace('"', "\\\""));
    let Ok(Some(element)) = document.query_selector(&selector) else {
        return;
    };

    let options = ScrollIntoViewOptions::new();
    options.set_behavior(ScrollBehavior::Smooth);
    options.set_block(ScrollLogicalPosition::Center);
    element.scroll_into_view_with_scroll_into_view_options(&options);
}

fn console_warn(message: &str) {
    web_sys::console::warn_1(&JsValue::from_str(message));
}

#[derive(Properties, PartialEq)]
pub struct ProjectImageProps {
    #[prop_or_default]
    pub class: Classes,
    pub src: String,
    pub alt: String,
}

#[function_component(ProjectImage)]
fn project_image(props: &ProjectImageProps) -> Html {
    html! {
        <img
            class={classes!("thumbnail-media", props.class.clone())}
            src={props.src.clone()}
            alt={props.alt.clone()}
            draggable="false"
            loading="lazy"
        />
    }
}

#[derive(Properties, PartialEq)]
pub struct ThumbnailProps {
    pub item: Project,
    #[prop_or_default]
    pub class: Classes,
    #[prop_or_default]
    pub ratio: AspectRatio,
    /// Explicit media URL that bypasses CDN resolution.
    #[prop_or_default]
    pub src: Option<AttrValue>,
}

/// Clickable media thumbnail for a project entry. Clicking scrolls the page
/// to the matching project section.
#[function_component(Thumbnail)]
pub fn thumbnail(props: &ThumbnailProps) -> Html {
    let item = &props.item;
    if !item.has_identity() {
        return Html::default();
    }

    let config = cdn_config();
    let effective = item.effective_thumbnail();
    let is_video = effective.is_some_and(MediaItem::is_video);

    let media_url = match media::resolve_media(&config, item, props.src.as_deref()) {
        Ok(resolved) => resolved.url().to_string(),
        Err(error) => {
            console_warn(&format!(
                "thumbnail media resolution failed for {}: {error}",
                item.id
            ));
            String::new()
        }
    };

    let onclick = {
        let target = item.scroll_target().map(ToString::to_string);
        Callback::from(move |_: MouseEvent| {
            if let Some(target) = target.as_deref() {
                scroll_to_project(target);
            }
        })
    };

    let on_video_error = Callback::from(|_: Event| {
        console_warn("thumbnail video failed to load");
    });

    let video_key = media::media_render_key(effective, &item.id);
    let frame_style = format!("aspect-ratio: {};", props.ratio.as_css());

    html! {
        <button type="button" class="thumbnail" {onclick}>
            <div class="thumbnail-frame" style={frame_style}>
                if is_video {
                    <>
                        <video
                            key={video_key}
                            class={classes!("thumbnail-media", props.class.clone())}
                            src={media_url.clone()}
                            autoplay=true
                            loop=true
                            muted=true
                            playsinline=true
                            draggable="false"
                            onerror={on_video_error}
                        >
                            <track kind="captions" />
                        </video>
                        if media_url.is_empty() {
                            <div class="thumbnail-missing">{MISSING_VIDEO_LABEL}</div>
                        }
                    </>
                } else {
                    <ProjectImage
                        class={props.class.clone()}
                        src={media_url}
                        alt={item.title.clone().unwrap_or_else(|| FALLBACK_ALT.to_string())}
                    />
                }
            </div>
        </button>
    }
}

#[derive(Clone, PartialEq)]
enum ProjectsState {
    Loading,
    Failed(String),
    Ready(Vec<Project>),
}

async fn fetch_projects() -> Result<Vec<Project>, String> {
    let response = Request::get("/api/projects")
        .send()
        .await
        .map_err(|error| error.to_string())?;
    let payload = response
        .json::<ProjectsPayload>()
        .await
        .map_err(|error| error.to_string())?;

    if !payload.ok {
        return Err(payload
            .error
            .unwrap_or_else(|| "content backend returned an error".to_string()));
    }

    Ok(payload.projects)
}

#[derive(Properties, PartialEq)]
struct ProjectListProps {
    projects: Vec<Project>,
}

#[function_component(ProjectGallery)]
fn project_gallery(props: &ProjectListProps) -> Html {
    html! {
        <section class="thumbnail-grid" aria-label="Project thumbnails">
            { for props.projects.iter().map(|project| html! {
                <Thumbnail key={project.id.clone()} item={project.clone()} />
            }) }
        </section>
    }
}

#[function_component(ProjectSections)]
fn project_sections(props: &ProjectListProps) -> Html {
    html! {
        <div class="project-sections">
            { for props
                .projects
                .iter()
                .filter(|project| project.has_identity())
                .map(|project| {
                    let target = project
                        .scroll_target()
                        .unwrap_or(project.id.as_str())
                        .to_string();
                    html! {
                        <section
                            key={project.id.clone()}
                            class="project-section"
                            data-project-id={target}
                        >
                            <h2>{project.title.clone().unwrap_or_else(|| "Untitled project".to_string())}</h2>
                            if let Some(summary) = project.summary.clone() {
                                <p class="project-summary">{summary}</p>
                            }
                        </section>
                    }
                }) }
        </div>
    }
}

#[function_component(App)]
fn app() -> Html {
    let projects = use_state(|| ProjectsState::Loading);

    {
        let projects = projects.clone();
        use_effect_with((), move |_| {
            spawn_local(async move {
                match fetch_projects().await {
                    Ok(loaded) => projects.set(ProjectsState::Ready(loaded)),
                    Err(message) => projects.set(ProjectsState::Failed(message)),
                }
            });
            || ()
        });
    }

    html! {
        <div class="page-shell">
            <header class="site-header">
                <h1>{"Selected Work"}</h1>
            </header>
            <main id="content">
                { match &*projects {
                    ProjectsState::Loading => html! {
                        <p class="status-line">{"Loading projects…"}</p>
                    },
                    ProjectsState::Failed(message) => html! {
                        <p class="status-line status-error">
                            {format!("Unable to load projects: {message}")}
                        </p>
                    },
                    ProjectsState::Ready(projects) => html! {
                        <>
                            <ProjectGallery projects={projects.clone()} />
                            <ProjectSections projects={projects.clone()} />
                        </>
                    },
                } }
            </main>
        </div>
    }
}

pub fn run() {
    yew::Renderer::<App>::with_root(
        window()
            .and_then(|w| w.document())
            .and_then(|d| d.get_element_by_id("app"))
            .expect("missing #app mount point"),
    )
    .render();
}
