use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Genre {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Description")]
    pub description: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Director {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Bio")]
    pub bio: String,
    #[serde(rename = "Birth", skip_serializing_if = "Option::is_none")]
    pub birth: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Movie {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Genre")]
    pub genre: Genre,
    #[serde(rename = "Director")]
    pub director: Director,
    #[serde(rename = "ImagePath")]
    pub image_path: String,
    #[serde(rename = "Featured")]
    pub featured: bool,
}

/// A stored user. `Password` is returned on every response, as the real
/// service does with its hash.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "Username")]
    pub username: String,
    #[serde(rename = "Password")]
    pub password: String,
    #[serde(rename = "Email")]
    pub email: String,
    #[serde(rename = "Birthday", skip_serializing_if = "Option::is_none")]
    pub birthday: Option<String>,
    #[serde(rename = "favoriteMovies")]
    pub favorite_movies: Vec<String>,
}

#[derive(Deserialize)]
pub struct NewUser {
    #[serde(rename = "Username")]
    pub username: String,
    #[serde(alias = "Password")]
    pub password: String,
    #[serde(alias = "Email")]
    pub email: String,
    #[serde(rename = "Birthday")]
    pub birthday: Option<String>,
}

#[derive(Deserialize)]
pub struct Login {
    #[serde(rename = "Username")]
    pub username: String,
    #[serde(alias = "Password")]
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginReply {
    pub user: User,
    pub token: String,
}

#[derive(Deserialize)]
pub struct UserUpdate {
    #[serde(rename = "Username")]
    pub username: Option<String>,
    #[serde(alias = "Password")]
    pub password: Option<String>,
    #[serde(rename = "Email", alias = "email")]
    pub email: Option<String>,
    #[serde(rename = "Birthday")]
    pub birthday: Option<String>,
    #[serde(rename = "favoriteMovies")]
    pub favorite_movies: Option<Vec<String>>,
}

#[derive(Default)]
pub struct Catalog {
    pub movies: Vec<Movie>,
    pub users: HashMap<String, User>,
    /// Bearer token -> username.
    pub tokens: HashMap<String, String>,
}

pub type Db = Arc<RwLock<Catalog>>;

type Reply<T> = Result<Json<T>, (StatusCode, String)>;

pub fn app() -> Router {
    app_with_movies(sample_movies())
}

pub fn app_with_movies(movies: Vec<Movie>) -> Router {
    let db: Db = Arc::new(RwLock::new(Catalog {
        movies,
        ..Catalog::default()
    }));
    Router::new()
        .route("/login", post(login))
        .route("/movies", get(list_movies))
        .route("/movies/{title}", get(get_movie))
        .route("/director/{name}", get(get_director))
        .route("/genre/{name}", get(get_genre))
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/{username}",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/users/{username}/favorites", get(list_favorites))
        .route(
            "/users/{username}/movies/{movie_id}",
            post(add_favorite).delete(remove_favorite),
        )
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub fn sample_movies() -> Vec<Movie> {
    let movie = |id: &str, title: &str, genre: &str, director: &str| Movie {
        id: id.to_string(),
        title: title.to_string(),
        description: format!("{title} description"),
        genre: Genre {
            name: genre.to_string(),
            description: format!("{genre} films"),
        },
        director: Director {
            name: director.to_string(),
            bio: format!("{director} biography"),
            birth: None,
        },
        image_path: format!("{id}.png"),
        featured: false,
    };
    vec![
        movie("m1", "Alien", "Horror", "Ridley Scott"),
        movie("m2", "Heat", "Crime", "Michael Mann"),
        movie("m42", "The Dark Knight", "Action", "Christopher Nolan"),
    ]
}

fn unauthorized() -> (StatusCode, String) {
    (StatusCode::UNAUTHORIZED, "Unauthorized".to_string())
}

fn not_found(what: &str) -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, format!("{what} not found"))
}

/// Resolve the bearer token to a username.
fn authorize(db: &Catalog, headers: &HeaderMap) -> Result<String, (StatusCode, String)> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(unauthorized)?;
    let token = value.strip_prefix("Bearer ").ok_or_else(unauthorized)?;
    db.tokens.get(token).cloned().ok_or_else(unauthorized)
}

async fn login(State(db): State<Db>, Json(input): Json<Login>) -> Reply<LoginReply> {
    let mut db = db.write().await;
    let user = db
        .users
        .get(&input.username)
        .filter(|u| u.password == input.password)
        .cloned()
        .ok_or((
            StatusCode::BAD_REQUEST,
            "Incorrect username or password.".to_string(),
        ))?;
    let token = Uuid::new_v4().to_string();
    db.tokens.insert(token.clone(), user.username.clone());
    Ok(Json(LoginReply { user, token }))
}

async fn create_user(
    State(db): State<Db>,
    Json(input): Json<NewUser>,
) -> Result<(StatusCode, Json<User>), (StatusCode, String)> {
    if input.username.is_empty() || input.password.is_empty() {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            "Username and password are required".to_string(),
        ));
    }
    let mut db = db.write().await;
    if db.users.contains_key(&input.username) {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("{} already exists", input.username),
        ));
    }
    let user = User {
        id: Uuid::new_v4().simple().to_string(),
        username: input.username,
        password: input.password,
        email: input.email,
        birthday: input.birthday,
        favorite_movies: Vec::new(),
    };
    db.users.insert(user.username.clone(), user.clone());
    Ok((StatusCode::CREATED, Json(user)))
}

async fn list_movies(State(db): State<Db>, headers: HeaderMap) -> Reply<Vec<Movie>> {
    let db = db.read().await;
    authorize(&db, &headers)?;
    Ok(Json(db.movies.clone()))
}

async fn get_movie(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(title): Path<String>,
) -> Reply<Movie> {
    let db = db.read().await;
    authorize(&db, &headers)?;
    db.movies
        .iter()
        .find(|m| m.title == title)
        .cloned()
        .map(Json)
        .ok_or_else(|| not_found("movie"))
}

async fn get_director(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(name): Path<String>,
) -> Reply<Director> {
    let db = db.read().await;
    authorize(&db, &headers)?;
    db.movies
        .iter()
        .find(|m| m.director.name == name)
        .map(|m| Json(m.director.clone()))
        .ok_or_else(|| not_found("director"))
}

async fn get_genre(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(name): Path<String>,
) -> Reply<Genre> {
    let db = db.read().await;
    authorize(&db, &headers)?;
    db.movies
        .iter()
        .find(|m| m.genre.name == name)
        .map(|m| Json(m.genre.clone()))
        .ok_or_else(|| not_found("genre"))
}

async fn list_users(State(db): State<Db>, headers: HeaderMap) -> Reply<Vec<User>> {
    let db = db.read().await;
    authorize(&db, &headers)?;
    let mut users: Vec<User> = db.users.values().cloned().collect();
    users.sort_by(|a, b| a.username.cmp(&b.username));
    Ok(Json(users))
}

async fn get_user(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(username): Path<String>,
) -> Reply<User> {
    let db = db.read().await;
    authorize(&db, &headers)?;
    db.users
        .get(&username)
        .cloned()
        .map(Json)
        .ok_or_else(|| not_found("user"))
}

async fn list_favorites(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(username): Path<String>,
) -> Reply<Vec<String>> {
    let db = db.read().await;
    authorize(&db, &headers)?;
    db.users
        .get(&username)
        .map(|u| Json(u.favorite_movies.clone()))
        .ok_or_else(|| not_found("user"))
}

async fn update_user(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(username): Path<String>,
    Json(input): Json<UserUpdate>,
) -> Reply<User> {
    let mut db = db.write().await;
    authorize(&db, &headers)?;
    let mut user = db.users.remove(&username).ok_or_else(|| not_found("user"))?;
    if let Some(password) = input.password {
        user.password = password;
    }
    if let Some(email) = input.email {
        user.email = email;
    }
    if let Some(birthday) = input.birthday {
        user.birthday = Some(birthday);
    }
    if let Some(favorites) = input.favorite_movies {
        user.favorite_movies = favorites;
    }
    if let Some(new_name) = input.username {
        for owner in db.tokens.values_mut().filter(|owner| **owner == username) {
            *owner = new_name.clone();
        }
        user.username = new_name;
    }
    db.users.insert(user.username.clone(), user.clone());
    Ok(Json(user))
}

async fn delete_user(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(username): Path<String>,
) -> Result<String, (StatusCode, String)> {
    let mut db = db.write().await;
    authorize(&db, &headers)?;
    db.users.remove(&username).ok_or_else(|| not_found("user"))?;
    db.tokens.retain(|_, owner| *owner != username);
    Ok(format!("{username} was deleted."))
}

async fn add_favorite(
    State(db): State<Db>,
    headers: HeaderMap,
    Path((username, movie_id)): Path<(String, String)>,
) -> Reply<User> {
    let mut db = db.write().await;
    authorize(&db, &headers)?;
    if !db.movies.iter().any(|m| m.id == movie_id) {
        return Err(not_found("movie"));
    }
    let user = db.users.get_mut(&username).ok_or_else(|| not_found("user"))?;
    if !user.favorite_movies.contains(&movie_id) {
        user.favorite_movies.push(movie_id);
    }
    Ok(Json(user.clone()))
}

async fn remove_favorite(
    State(db): State<Db>,
    headers: HeaderMap,
    Path((username, movie_id)): Path<(String, String)>,
) -> Reply<User> {
    let mut db = db.write().await;
    authorize(&db, &headers)?;
    let user = db.users.get_mut(&username).ok_or_else(|| not_found("user"))?;
    user.favorite_movies.retain(|id| *id != movie_id);
    Ok(Json(user.clone()))
}
